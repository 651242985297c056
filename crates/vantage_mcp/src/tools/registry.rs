//! Tool Registry - Tool Discovery and Dispatch
//!
//! Maintains the list of available tools and dispatches calls by name.
//! Written once at startup, read-only afterwards.

use super::McpTool;
use crate::auth::{AuthHook, CallContext, CallPhase, CallerIdentity};
use crate::error::{ErrorEnvelope, ErrorType, ToolError};
use crate::protocol::ToolDefinition;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Result of one dispatched call: a success payload or a typed error envelope.
#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub result: Result<Value, ErrorEnvelope>,
    /// Last phase reached before responding
    pub phase: CallPhase,
    pub duration: Duration,
}

impl ToolResponse {
    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }

    /// JSON payload sent to the client.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match &self.result {
            Ok(value) => Ok(value.clone()),
            Err(envelope) => serde_json::to_value(envelope),
        }
    }
}

/// Registry of available MCP tools
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn McpTool>>,
    auth: Arc<dyn AuthHook>,
}

impl ToolRegistry {
    /// Create an empty registry guarded by `auth`
    pub fn new(auth: Arc<dyn AuthHook>) -> Self {
        Self {
            tools: HashMap::new(),
            auth,
        }
    }

    /// Register a tool
    pub fn register(&mut self, tool: Box<dyn McpTool>) {
        let name = tool.name().to_string();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, tool);
    }

    /// List all available tools, sorted by name
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Call a tool by name
    ///
    /// Unknown tools are rejected before any engine runs and are the only
    /// `Err` this returns; every other failure comes back as an envelope.
    pub async fn call_tool(
        &self,
        name: &str,
        args: Value,
        caller: &CallerIdentity,
    ) -> Result<ToolResponse, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        debug!(tool = name, phase = %CallPhase::Received, "Tool call received");
        let started = Instant::now();
        let ctx = CallContext::new(name, caller, self.auth.as_ref());
        let outcome = tool.execute(args, &ctx).await;
        let duration = started.elapsed();
        let phase = CallPhase::before_response(&outcome);

        let result = match outcome {
            Ok(value) => {
                info!(tool = name, duration_ms = duration.as_millis() as u64, "Tool call succeeded");
                Ok(value)
            }
            Err(err) => {
                match err.error_type() {
                    ErrorType::InternalError => error!(tool = name, "Tool call failed: {}", err),
                    ErrorType::ValidationError => warn!(tool = name, "Rejected tool call: {}", err),
                    _ => info!(tool = name, error_type = %err.error_type(), "Tool call refused"),
                }
                Err(err.to_envelope())
            }
        };

        debug!(tool = name, %phase, "Responding");
        Ok(ToolResponse {
            result,
            phase,
            duration,
        })
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<&dyn McpTool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AllowAll;
    use crate::memory::Catalog;
    use crate::tools::{create_default_registry, ListLimits, ResourceDaos};

    fn registry() -> ToolRegistry {
        create_default_registry(
            ResourceDaos::from_catalog(&Catalog::default()),
            Arc::new(AllowAll),
            ListLimits::default(),
        )
    }

    #[test]
    fn test_registry_has_core_tools() {
        let registry = registry();

        for name in [
            "list_dashboards",
            "get_dashboard_info",
            "get_dashboard_available_filters",
            "list_charts",
            "get_chart_info",
            "get_chart_available_filters",
            "list_datasets",
            "get_dataset_info",
            "get_dataset_available_filters",
            "health_check",
            "get_instance_info",
        ] {
            assert!(registry.has_tool(name), "missing {}", name);
        }
        assert_eq!(registry.len(), 11);
    }

    #[test]
    fn test_list_tools_sorted() {
        let tools = registry().list_tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_rejected() {
        let result = registry()
            .call_tool("drop_everything", Value::Null, &CallerIdentity::anonymous())
            .await;
        assert!(matches!(result, Err(ToolError::UnknownTool(name)) if name == "drop_everything"));
    }

    #[tokio::test]
    async fn test_validation_failure_is_an_envelope() {
        let response = registry()
            .call_tool(
                "list_charts",
                serde_json::json!({"bogus": true}),
                &CallerIdentity::anonymous(),
            )
            .await
            .unwrap();
        assert!(response.is_error());
        assert_eq!(response.phase, CallPhase::Received);
        let payload = response.payload().unwrap();
        assert_eq!(payload["error_type"], "validation_error");
    }
}
