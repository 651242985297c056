//! health_check - Liveness probe

use super::{parse_args, McpTool};
use crate::auth::CallContext;
use crate::envelope::{response_timestamp, rfc3339};
use crate::error::ToolError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    #[serde(with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
}

pub struct HealthCheckTool {
    version: String,
}

impl HealthCheckTool {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

#[async_trait]
impl McpTool for HealthCheckTool {
    fn name(&self) -> &str {
        "health_check"
    }

    fn description(&self) -> &str {
        "Report that the MCP service is up, with its version"
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
        ctx.authorize()?;
        Ok(serde_json::to_value(HealthStatus {
            status: "healthy".to_string(),
            service: "mcp".to_string(),
            version: self.version.clone(),
            timestamp: response_timestamp(),
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAll, CallerIdentity};

    #[tokio::test]
    async fn test_health_payload() {
        let caller = CallerIdentity::anonymous();
        let ctx = CallContext::new("health_check", &caller, &AllowAll);
        let value = HealthCheckTool::new("1.2.3").execute(Value::Null, &ctx).await.unwrap();
        let status: HealthStatus = serde_json::from_value(value).unwrap();
        assert_eq!(status.status, "healthy");
        assert_eq!(status.service, "mcp");
        assert_eq!(status.version, "1.2.3");
    }
}
