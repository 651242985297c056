//! get_<resource>_info - Generic Get-Info Engine
//!
//! Resolves an identifier through the resource's identifier policy and
//! returns the detail view, flat or nested under the resource name.

use super::{parse_args, McpTool};
use crate::auth::{Authorized, CallContext};
use crate::dao::ModelDao;
use crate::error::ToolError;
use crate::identifier::{resolve, Identifier};
use crate::resource::{DetailShape, Resource};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{error, info, warn};

/// `{ "identifier": <int | text> }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetRequest {
    pub identifier: Identifier,
}

/// Get tools also accept a bare identifier.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GetArgs {
    Wrapped(GetRequest),
    Bare(Identifier),
}

impl From<GetArgs> for GetRequest {
    fn from(args: GetArgs) -> Self {
        match args {
            GetArgs::Wrapped(request) => request,
            GetArgs::Bare(identifier) => GetRequest { identifier },
        }
    }
}

pub struct ModelGetInfoTool<R: Resource> {
    name: String,
    description: String,
    dao: Arc<dyn ModelDao<R::Entity>>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ModelGetInfoTool<R> {
    pub fn new(dao: Arc<dyn ModelDao<R::Entity>>) -> Self {
        let forms = if R::IDENTIFIERS.slugs {
            "integer id, UUID or slug"
        } else {
            "integer id or UUID"
        };
        Self {
            name: format!("get_{}_info", R::NAME),
            description: format!("Get detailed information about a {} by {}", R::NAME, forms),
            dao,
            _resource: PhantomData,
        }
    }

    async fn get(&self, request: GetRequest, _proof: Authorized) -> Result<Value, ToolError> {
        let identifier = request.identifier;

        let entity = resolve(self.dao.as_ref(), &identifier, R::IDENTIFIERS)
            .await?
            .ok_or_else(|| {
                warn!(tool = %self.name, identifier = %identifier, "{} not found", R::LABEL);
                ToolError::NotFound(format!(
                    "{} with identifier '{}' not found",
                    R::LABEL,
                    identifier
                ))
            })?;

        let detail = R::serialize_detail(&entity).map_err(|e| {
            error!(tool = %self.name, identifier = %identifier, "Failed to serialize {}: {}", R::NAME, e);
            ToolError::internal(format!("serializing {} '{}': {}", R::NAME, identifier, e))
        })?;

        info!(tool = %self.name, identifier = %identifier, "Fetched {}", R::NAME);
        Ok(match R::DETAIL_SHAPE {
            DetailShape::Flat => detail,
            DetailShape::Wrapped => {
                let mut wrapper = Map::new();
                wrapper.insert(R::NAME.to_string(), detail);
                Value::Object(wrapper)
            }
        })
    }
}

#[async_trait]
impl<R: Resource> McpTool for ModelGetInfoTool<R> {
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
            "required": ["identifier"],
            "properties": {
                "identifier": {
                    "description": self.description,
                    "oneOf": [
                        { "type": "integer", "minimum": 1 },
                        { "type": "string", "minLength": 1 }
                    ]
                }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &CallContext<'_>) -> Result<Value, ToolError> {
        let request: GetRequest = parse_args::<GetArgs>(args)?.into();
        let proof = ctx.authorize()?;
        self.get(request, proof).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAll, CallerIdentity};
    use crate::memory::MemoryDao;
    use crate::resources::{Dataset, DatasetResource};

    fn tool() -> ModelGetInfoTool<DatasetResource> {
        ModelGetInfoTool::new(Arc::new(MemoryDao::new(vec![Dataset::new(9, "orders")])))
    }

    async fn call(args: Value) -> Result<Value, ToolError> {
        let caller = CallerIdentity::anonymous();
        let ctx = CallContext::new("get_dataset_info", &caller, &AllowAll);
        tool().execute(args, &ctx).await
    }

    #[tokio::test]
    async fn test_wrapped_detail() {
        let value = call(json!({"identifier": 9})).await.unwrap();
        assert_eq!(value["dataset"]["table_name"], "orders");
    }

    #[tokio::test]
    async fn test_bare_identifier_accepted() {
        let value = call(json!("9")).await.unwrap();
        assert_eq!(value["dataset"]["id"], 9);
    }

    #[tokio::test]
    async fn test_not_found_message() {
        let err = call(json!({"identifier": 404})).await.unwrap_err();
        assert_eq!(err.to_string(), "Dataset with identifier '404' not found");
    }

    #[tokio::test]
    async fn test_missing_identifier_is_validation_error() {
        let err = call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
        let err = call(json!({"identifier": 1, "extra": true})).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }
}
