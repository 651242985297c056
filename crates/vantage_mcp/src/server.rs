//! MCP Server Implementation
//!
//! JSON-RPC 2.0 server for the Model Context Protocol.
//!
//! # Architecture
//!
//! The server reads one JSON-RPC message per line and writes one response
//! per line. Requests are handled in arrival order; each `tools/call` is
//! dispatched through the [`ToolRegistry`], so validation and the auth hook
//! run before any DAO is touched.
//!
//! # Example
//!
//! ```ignore
//! let config = McpServerConfig::default();
//! let mut server = McpServer::from_catalog(config, Catalog::default())?;
//! server.run(&mut McpTransport::stdio()).await?;
//! ```

use crate::auth::CallerIdentity;
use crate::config::McpServerConfig;
use crate::memory::Catalog;
use crate::protocol::{
    methods, ContentBlock, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, McpTransport, RequestId, ServerCapabilities, ServerInfo, ToolsCallParams,
    ToolsCallResult, ToolsCapability, ToolsListResult, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
use crate::security::{AuditLog, SecurityConfig};
use crate::tools::{create_default_registry, ResourceDaos, ToolRegistry};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, warn};

/// MCP Server
pub struct McpServer {
    config: McpServerConfig,
    security: SecurityConfig,
    tools: ToolRegistry,
    initialized: bool,
    /// Client name from `initialize`
    client: Option<String>,
    /// Key used when a `tools/call` carries no credentials of its own
    default_api_key: Option<String>,
}

impl McpServer {
    pub fn new(config: McpServerConfig, tools: ToolRegistry, security: SecurityConfig) -> Self {
        Self {
            config,
            security,
            tools,
            initialized: false,
            client: None,
            default_api_key: None,
        }
    }

    /// Build the registry and security subsystem from `config`, serving
    /// the entities in `catalog`.
    pub fn from_catalog(config: McpServerConfig, catalog: Catalog) -> Result<Self> {
        let audit_log = config
            .audit_log_path
            .as_ref()
            .map(|p| AuditLog::new(p.clone()))
            .transpose()
            .context("Failed to open audit log")?;
        let security = SecurityConfig::new(config.output_budget(), audit_log);

        let tools = create_default_registry(
            ResourceDaos::from_catalog(&catalog),
            config.auth_hook(),
            config.list_limits(),
        );

        Ok(Self::new(config, tools, security))
    }

    pub fn with_default_api_key(mut self, key: impl Into<String>) -> Self {
        self.default_api_key = Some(key.into());
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Serve until the reader reaches EOF
    pub async fn run<R, W>(&mut self, transport: &mut McpTransport<R, W>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            "MCP server starting ({} tools, {} v{})",
            self.tools.len(),
            self.config.server_name,
            self.config.server_version
        );

        while let Some(line) = transport
            .read_line()
            .await
            .context("Failed to read request")?
        {
            if let Some(response) = self.handle_line(&line).await {
                transport
                    .write_response(&response)
                    .await
                    .context("Failed to write response")?;
            }
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Handle one raw line. Returns `None` for notifications.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                warn!("Unparseable request: {}", e);
                let response =
                    JsonRpcResponse::error(RequestId::Null, JsonRpcError::parse_error(format!("Invalid JSON: {}", e)));
                self.audit_response(&response);
                return Some(response);
            }
        };

        if let Some(audit) = &self.security.audit_log {
            if let Err(e) = audit.log_request(&request) {
                warn!("{}", e);
            }
        }

        let response = self.handle_request(request).await?;
        self.audit_response(&response);
        Some(response)
    }

    /// Handle a single JSON-RPC request. Returns `None` for notifications.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = match request.id.clone() {
            Some(id) => id,
            None => {
                self.handle_notification(&request);
                return None;
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Invalid JSON-RPC version: {}", request.jsonrpc)),
            ));
        }

        debug!("Handling {} (id={:?})", request.method, id);
        let outcome = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(request.params),
            methods::INITIALIZED => Ok(Value::Object(Default::default())),
            methods::PING => Ok(Value::Object(Default::default())),
            methods::TOOLS_LIST => to_result(&ToolsListResult {
                tools: self.tools.list_tools(),
            }),
            methods::TOOLS_CALL => self.handle_tools_call(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::error(id, err),
        })
    }

    fn handle_notification(&mut self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            methods::INITIALIZED => debug!("Client reported initialized"),
            other => debug!("Ignoring notification: {}", other),
        }
    }

    fn handle_initialize(&mut self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing initialize params"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))
            })?;

        match &params.client_info {
            Some(client) => info!(
                "Initialize from {} v{} (protocol {})",
                client.name, client.version, params.protocol_version
            ),
            None => info!("Initialize (protocol {})", params.protocol_version),
        }

        self.client = params.client_info.map(|c| c.name);
        self.initialized = true;

        to_result(&InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.config.server_name.clone(),
                version: self.config.server_version.clone(),
            },
        })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !self.initialized {
            return Err(JsonRpcError::not_initialized());
        }

        let params: ToolsCallParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tool call params"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tool call params: {}", e)))
            })?;

        let caller = self.caller_for(&params);
        info!("Tool call: {}", params.name);

        let response = self
            .tools
            .call_tool(&params.name, params.arguments, &caller)
            .await
            .map_err(|e| {
                warn!("{}", e);
                JsonRpcError::from_tool_error(&e)
            })?;

        if let Some(audit) = &self.security.audit_log {
            let error_type = response.result.as_ref().err().map(|env| env.error_type);
            if let Err(e) = audit.log_tool_call(
                &params.name,
                response.phase,
                error_type,
                response.duration.as_millis() as u64,
            ) {
                warn!("{}", e);
            }
        }

        let json = response
            .payload()
            .and_then(|payload| serde_json::to_string(&payload))
            .map_err(|e| {
                error!("Failed to serialize tool result: {}", e);
                JsonRpcError::internal_error("Failed to serialize tool result")
            })?;
        let budgeted = self.security.output_budget.enforce(json);

        to_result(&ToolsCallResult {
            content: vec![ContentBlock::text(budgeted.content)],
            is_error: response.is_error(),
        })
    }

    fn caller_for(&self, params: &ToolsCallParams) -> CallerIdentity {
        let presented = params
            .meta
            .as_ref()
            .and_then(|meta| meta.authorization.clone().or_else(|| meta.api_key.clone()));

        CallerIdentity {
            client: self.client.clone(),
            user: None,
            api_key: presented.or_else(|| self.default_api_key.clone()),
        }
    }

    fn audit_response(&self, response: &JsonRpcResponse) {
        if let Some(audit) = &self.security.audit_log {
            if let Err(e) = audit.log_response(response) {
                warn!("{}", e);
            }
        }
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| {
        error!("Failed to serialize result: {}", e);
        JsonRpcError::internal_error("Failed to serialize result")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Dashboard;
    use serde_json::json;

    fn test_server(api_keys: &[&str]) -> McpServer {
        let mut config = McpServerConfig::default();
        config.audit_log_path = None;
        config.auth.api_keys = api_keys.iter().map(|k| k.to_string()).collect();
        let catalog = Catalog {
            dashboards: vec![Dashboard::new(1, "Sales"), Dashboard::new(2, "Ops")],
            ..Default::default()
        };
        McpServer::from_catalog(config, catalog).unwrap()
    }

    async fn call(server: &mut McpServer, id: i64, method: &str, params: Value) -> JsonRpcResponse {
        server
            .handle_request(JsonRpcRequest::new(id, method, Some(params)))
            .await
            .unwrap()
    }

    async fn initialize(server: &mut McpServer) {
        let response = call(
            server,
            0,
            methods::INITIALIZE,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "0.0.1"}
            }),
        )
        .await;
        assert!(response.error.is_none());
    }

    fn tool_payload(response: &JsonRpcResponse) -> (Value, bool) {
        let result: ToolsCallResult = serde_json::from_value(response.result.clone().unwrap()).unwrap();
        let ContentBlock::Text { text } = &result.content[0];
        (serde_json::from_str(text).unwrap(), result.is_error)
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let mut server = test_server(&[]);
        let response = call(
            &mut server,
            1,
            methods::INITIALIZE,
            json!({"protocolVersion": MCP_PROTOCOL_VERSION, "clientInfo": {"name": "c"}}),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "vantage-mcp");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_tools_call_requires_initialize() {
        let mut server = test_server(&[]);
        let response = call(&mut server, 1, methods::TOOLS_CALL, json!({"name": "health_check"})).await;
        assert_eq!(response.error.unwrap().code, -32002);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let mut server = test_server(&[]);
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mut server = test_server(&[]);
        let response = server.handle_line("{not json").await.unwrap();
        assert_eq!(response.id, RequestId::Null);
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let mut server = test_server(&[]);
        initialize(&mut server).await;

        let response = call(&mut server, 2, "resources/list", json!({})).await;
        assert_eq!(response.error.unwrap().code, -32601);

        let response = call(&mut server, 3, methods::TOOLS_CALL, json!({"name": "drop_tables"})).await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_tools_list_is_sorted() {
        let mut server = test_server(&[]);
        let response = call(&mut server, 1, methods::TOOLS_LIST, json!({})).await;
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 11);
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(tools[0].get("inputSchema").is_some());
    }

    #[tokio::test]
    async fn test_tool_success_and_envelope() {
        let mut server = test_server(&[]);
        initialize(&mut server).await;

        let response = call(
            &mut server,
            2,
            methods::TOOLS_CALL,
            json!({"name": "list_dashboards", "arguments": {"page_size": 1}}),
        )
        .await;
        let (payload, is_error) = tool_payload(&response);
        assert!(!is_error);
        assert_eq!(payload["count"], 1);
        assert_eq!(payload["total_count"], 2);

        let response = call(
            &mut server,
            3,
            methods::TOOLS_CALL,
            json!({"name": "get_dashboard_info", "arguments": {"identifier": 99}}),
        )
        .await;
        let (payload, is_error) = tool_payload(&response);
        assert!(is_error);
        assert_eq!(payload["error_type"], "not_found");
    }

    #[tokio::test]
    async fn test_api_key_from_meta() {
        let mut server = test_server(&["k-1"]);
        initialize(&mut server).await;

        let response = call(&mut server, 2, methods::TOOLS_CALL, json!({"name": "health_check"})).await;
        let (payload, is_error) = tool_payload(&response);
        assert!(is_error);
        assert_eq!(payload["error_type"], "access_denied");

        let response = call(
            &mut server,
            3,
            methods::TOOLS_CALL,
            json!({"name": "health_check", "_meta": {"authorization": "Bearer nope"}}),
        )
        .await;
        let (payload, _) = tool_payload(&response);
        assert_eq!(payload["error_type"], "authorization_failed");

        let response = call(
            &mut server,
            4,
            methods::TOOLS_CALL,
            json!({"name": "health_check", "_meta": {"api_key": "k-1"}}),
        )
        .await;
        let (payload, is_error) = tool_payload(&response);
        assert!(!is_error);
        assert_eq!(payload["status"], "healthy");
    }

    #[tokio::test]
    async fn test_default_api_key() {
        let mut server = test_server(&["k-1"]).with_default_api_key("k-1");
        initialize(&mut server).await;

        let response = call(&mut server, 2, methods::TOOLS_CALL, json!({"name": "health_check"})).await;
        let (_, is_error) = tool_payload(&response);
        assert!(!is_error);
    }

    #[tokio::test]
    async fn test_oversized_result_is_replaced() {
        let mut config = McpServerConfig::default();
        config.audit_log_path = None;
        config.max_response_bytes = 64;
        let catalog = Catalog {
            dashboards: (1..=20).map(|i| Dashboard::new(i, &format!("Dashboard {}", i))).collect(),
            ..Default::default()
        };
        let mut server = McpServer::from_catalog(config, catalog).unwrap();
        initialize(&mut server).await;

        let response = call(&mut server, 2, methods::TOOLS_CALL, json!({"name": "list_dashboards"})).await;
        let (payload, is_error) = tool_payload(&response);
        assert!(!is_error);
        assert_eq!(payload["truncated"], true);
        assert_eq!(payload["max_bytes"], 64);
    }
}
