//! get_<resource>_available_filters - Available-Filters Engine

use super::{parse_args, McpTool};
use crate::auth::{Authorized, CallContext};
use crate::dao::ModelDao;
use crate::error::ToolError;
use crate::filters::AvailableFilters;
use crate::resource::Resource;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Takes no arguments; anything extra is rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

pub struct ModelGetAvailableFiltersTool<R: Resource> {
    name: String,
    description: String,
    dao: Arc<dyn ModelDao<R::Entity>>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ModelGetAvailableFiltersTool<R> {
    pub fn new(dao: Arc<dyn ModelDao<R::Entity>>) -> Self {
        Self {
            name: format!("get_{}_available_filters", R::NAME),
            description: format!(
                "Describe the filterable columns, operators and selectable columns for {}",
                R::PLURAL
            ),
            dao,
            _resource: PhantomData,
        }
    }

    /// DAO introspection when offered, otherwise the static vocabulary.
    fn available_filters(&self, _proof: Authorized) -> AvailableFilters {
        match self.dao.filterable_columns() {
            Some(vocabulary) => {
                debug!(tool = %self.name, "Using DAO-published vocabulary");
                vocabulary.describe()
            }
            None => R::vocabulary().describe(),
        }
    }
}

#[async_trait]
impl<R: Resource> McpTool for ModelGetAvailableFiltersTool<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {}
        })
    }

    async fn execute(&self, args: Value, ctx: &CallContext<'_>) -> Result<Value, ToolError> {
        let _: NoArgs = parse_args(args)?;
        let proof = ctx.authorize()?;
        Ok(serde_json::to_value(self.available_filters(proof))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAll, CallerIdentity};
    use crate::filters::{ColumnType, FilterVocabulary, Operator};
    use crate::memory::MemoryDao;
    use crate::resources::{Chart, ChartResource};

    async fn call(tool: &ModelGetAvailableFiltersTool<ChartResource>, args: Value) -> Result<Value, ToolError> {
        let caller = CallerIdentity::anonymous();
        let ctx = CallContext::new("get_chart_available_filters", &caller, &AllowAll);
        tool.execute(args, &ctx).await
    }

    #[tokio::test]
    async fn test_static_vocabulary_payload() {
        let tool = ModelGetAvailableFiltersTool::<ChartResource>::new(Arc::new(MemoryDao::<Chart>::new(vec![])));
        let value = call(&tool, json!({})).await.unwrap();
        assert_eq!(value["filters"]["slice_name"]["type"], "text");
        assert!(value["operators"].as_array().unwrap().contains(&json!("ilike")));
        assert!(value["columns"].as_array().unwrap().contains(&json!("viz_type")));
    }

    #[tokio::test]
    async fn test_dao_vocabulary_wins() {
        let published = FilterVocabulary::new()
            .column("slice_name", ColumnType::Text, "Chart name", &[Operator::Eq])
            .projectable(&["id"]);
        let dao = MemoryDao::<Chart>::new(vec![]).with_vocabulary(published);
        let tool = ModelGetAvailableFiltersTool::<ChartResource>::new(Arc::new(dao));
        let value = call(&tool, Value::Null).await.unwrap();
        assert_eq!(value["operators"], json!(["eq"]));
        assert_eq!(value["columns"], json!(["id"]));
    }

    #[tokio::test]
    async fn test_extra_arguments_rejected() {
        let tool = ModelGetAvailableFiltersTool::<ChartResource>::new(Arc::new(MemoryDao::<Chart>::new(vec![])));
        let err = call(&tool, json!({"column": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }
}
