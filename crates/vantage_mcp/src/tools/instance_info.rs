//! get_instance_info - Instance-wide counts

use super::{parse_args, McpTool, ResourceDaos};
use crate::auth::{Authorized, CallContext};
use crate::envelope::{response_timestamp, rfc3339};
use crate::error::ToolError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub total_dashboards: u64,
    pub total_charts: u64,
    pub total_datasets: u64,
    /// Rounded to two decimals; 0 when there are no dashboards
    pub avg_charts_per_dashboard: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub instance_summary: InstanceSummary,
    #[serde(with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
}

pub struct InstanceInfoTool {
    daos: ResourceDaos,
}

impl InstanceInfoTool {
    pub fn new(daos: ResourceDaos) -> Self {
        Self { daos }
    }

    async fn summarize(&self, _proof: Authorized) -> Result<InstanceSummary, ToolError> {
        let total_dashboards = self.daos.dashboards.count().await?;
        let total_charts = self.daos.charts.count().await?;
        let total_datasets = self.daos.datasets.count().await?;
        debug!(total_dashboards, total_charts, total_datasets, "Counted instance entities");

        let avg_charts_per_dashboard = if total_dashboards == 0 {
            0.0
        } else {
            (total_charts as f64 / total_dashboards as f64 * 100.0).round() / 100.0
        };

        Ok(InstanceSummary {
            total_dashboards,
            total_charts,
            total_datasets,
            avg_charts_per_dashboard,
        })
    }
}

#[async_trait]
impl McpTool for InstanceInfoTool {
    fn name(&self) -> &str {
        "get_instance_info"
    }

    fn description(&self) -> &str {
        "Summarize the instance: dashboard, chart and dataset counts"
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
        let instance_summary = self.summarize(proof).await?;
        Ok(serde_json::to_value(InstanceInfo {
            instance_summary,
            timestamp: response_timestamp(),
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAll, CallerIdentity};
    use crate::memory::Catalog;
    use crate::resources::{Chart, Dashboard};

    #[tokio::test]
    async fn test_counts_and_average() {
        let catalog = Catalog {
            dashboards: vec![Dashboard::new(1, "A"), Dashboard::new(2, "B"), Dashboard::new(3, "C")],
            charts: vec![Chart::new(1, "x", "bar"), Chart::new(2, "y", "line")],
            datasets: vec![],
        };
        let tool = InstanceInfoTool::new(ResourceDaos::from_catalog(&catalog));
        let caller = CallerIdentity::anonymous();
        let ctx = CallContext::new("get_instance_info", &caller, &AllowAll);

        let value = tool.execute(json!({}), &ctx).await.unwrap();
        let info: InstanceInfo = serde_json::from_value(value).unwrap();
        assert_eq!(info.instance_summary.total_dashboards, 3);
        assert_eq!(info.instance_summary.total_charts, 2);
        assert_eq!(info.instance_summary.total_datasets, 0);
        assert_eq!(info.instance_summary.avg_charts_per_dashboard, 0.67);
    }
}
