//! End-to-end tool dispatch: validation, auth hook, DAO, serializer, envelope.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use vantage_mcp::auth::{AllowAll, AuthDecision, AuthHook, CallerIdentity};
use vantage_mcp::dao::{DaoError, ListQuery, ModelDao};
use vantage_mcp::filters::FilterVocabulary;
use vantage_mcp::memory::{Catalog, MemoryDao};
use vantage_mcp::protocol::{JsonRpcResponse, McpTransport};
use vantage_mcp::resources::{Chart, Dashboard, Dataset};
use vantage_mcp::tools::{create_default_registry, ListLimits, ResourceDaos, ToolRegistry};
use vantage_mcp::{McpServer, McpServerConfig};

// =============================================================================
// Fixtures
// =============================================================================

/// Wraps the dashboard DAO and records which operations were called.
struct RecordingDao {
    inner: MemoryDao<Dashboard>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingDao {
    fn new(inner: MemoryDao<Dashboard>) -> (Self, Arc<Mutex<Vec<&'static str>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inner,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().unwrap().push(op);
    }
}

#[async_trait]
impl ModelDao<Dashboard> for RecordingDao {
    async fn list(&self, query: &ListQuery) -> Result<(Vec<Dashboard>, u64), DaoError> {
        self.record("list");
        self.inner.list(query).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Dashboard>, DaoError> {
        self.record("find_by_id");
        self.inner.find_by_id(id).await
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Dashboard>, DaoError> {
        self.record("find_by_uuid");
        self.inner.find_by_uuid(uuid).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Dashboard>, DaoError> {
        self.record("find_by_slug");
        self.inner.find_by_slug(slug).await
    }

    fn filterable_columns(&self) -> Option<FilterVocabulary> {
        self.inner.filterable_columns()
    }

    async fn count(&self) -> Result<u64, DaoError> {
        self.record("count");
        self.inner.count().await
    }
}

const SALES_UUID: &str = "0b8a9c4e-1f2d-4e6a-9b3c-5d7e8f9a0b1c";

fn dashboards() -> Vec<Dashboard> {
    let mut sales = Dashboard::new(1, "Sales Overview");
    sales.slug = Some("sales".to_string());
    sales.uuid = Some(Uuid::parse_str(SALES_UUID).unwrap());
    sales.published = true;

    let mut ops = Dashboard::new(2, "Ops Health");
    ops.slug = Some("ops".to_string());

    let mut finance = Dashboard::new(3, "Finance");
    finance.published = true;

    vec![sales, ops, finance, Dashboard::new(4, "Marketing"), Dashboard::new(5, "Support")]
}

fn charts() -> Vec<Chart> {
    let mut revenue = Chart::new(10, "Revenue", "line");
    revenue.datasource_type = Some("table".to_string());
    let mut tickets = Chart::new(11, "Tickets", "bar");
    tickets.datasource_type = Some("query".to_string());
    vec![revenue, tickets]
}

fn catalog() -> Catalog {
    Catalog {
        dashboards: dashboards(),
        charts: charts(),
        datasets: vec![Dataset::new(100, "orders")],
    }
}

fn registry_with(catalog: &Catalog, auth: Arc<dyn AuthHook>) -> ToolRegistry {
    create_default_registry(ResourceDaos::from_catalog(catalog), auth, ListLimits::default())
}

fn registry() -> ToolRegistry {
    registry_with(&catalog(), Arc::new(AllowAll))
}

/// Registry whose dashboard DAO records every call.
fn recording_registry(auth: Arc<dyn AuthHook>) -> (ToolRegistry, Arc<Mutex<Vec<&'static str>>>) {
    let catalog = catalog();
    let (dao, calls) = RecordingDao::new(catalog.dashboard_dao());
    let mut daos = ResourceDaos::from_catalog(&catalog);
    daos.dashboards = Arc::new(dao);
    (create_default_registry(daos, auth, ListLimits::default()), calls)
}

async fn call_ok(registry: &ToolRegistry, tool: &str, args: Value) -> Value {
    let response = registry
        .call_tool(tool, args, &CallerIdentity::anonymous())
        .await
        .unwrap();
    match response.result {
        Ok(value) => value,
        Err(envelope) => panic!("{} failed: {:?}", tool, envelope),
    }
}

async fn call_err(registry: &ToolRegistry, tool: &str, args: Value) -> Value {
    let response = registry
        .call_tool(tool, args, &CallerIdentity::anonymous())
        .await
        .unwrap();
    assert!(response.is_error(), "{} unexpectedly succeeded", tool);
    response.payload().unwrap()
}

fn without_timestamp(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        obj.remove("timestamp");
    }
    value
}

// =============================================================================
// List
// =============================================================================

#[tokio::test]
async fn test_empty_list() {
    let registry = registry_with(&Catalog::default(), Arc::new(AllowAll));
    let result = call_ok(&registry, "list_charts", json!({})).await;

    assert_eq!(result["items"], json!([]));
    assert_eq!(result["count"], 0);
    assert_eq!(result["total_count"], 0);
    assert_eq!(result["has_next"], false);
    assert_eq!(result["has_previous"], false);
}

#[tokio::test]
async fn test_text_and_sequence_filters_agree() {
    let registry = registry();
    let clauses = json!([{"col": "published", "opr": "eq", "value": true}]);

    let from_sequence = call_ok(&registry, "list_dashboards", json!({"filters": clauses})).await;
    let from_text = call_ok(
        &registry,
        "list_dashboards",
        json!({"filters": clauses.to_string()}),
    )
    .await;

    assert_eq!(without_timestamp(from_sequence.clone()), without_timestamp(from_text));
    assert_eq!(from_sequence["total_count"], 2);
    assert_eq!(
        from_sequence["filters_applied"],
        json!([{"column": "published", "operator": "eq", "value": true}])
    );
}

#[tokio::test]
async fn test_filters_applied_round_trip() {
    let registry = registry();
    let first = call_ok(
        &registry,
        "list_dashboards",
        json!({
            "filters": [
                {"col": "published", "opr": "eq", "value": true},
                {"col": "dashboard_title", "opr": "not_in", "value": ["Finance"]}
            ],
            "page": 1,
            "page_size": 2
        }),
    )
    .await;
    assert_eq!(first["total_count"], 1);
    assert_eq!(
        first["filters_applied"],
        json!([
            {"column": "published", "operator": "eq", "value": true},
            {"column": "dashboard_title", "operator": "nin", "value": ["Finance"]}
        ])
    );

    let second = call_ok(
        &registry,
        "list_dashboards",
        json!({"filters": first["filters_applied"].clone(), "page": 1, "page_size": 2}),
    )
    .await;
    assert_eq!(second["total_count"], first["total_count"]);
    assert_eq!(second["filters_applied"], first["filters_applied"]);
    assert_eq!(second["items"], first["items"]);
}

#[tokio::test]
async fn test_uuid_filter_accepts_any_spelling() {
    let registry = registry();
    let upper = SALES_UUID.to_uppercase();
    let simple = SALES_UUID.replace('-', "");

    for value in [json!(SALES_UUID), json!(upper), json!(simple)] {
        let result = call_ok(
            &registry,
            "list_dashboards",
            json!({"filters": [{"column": "uuid", "operator": "eq", "value": value}]}),
        )
        .await;
        assert_eq!(result["total_count"], 1, "{}", value);
        assert_eq!(
            result["filters_applied"],
            json!([{"column": "uuid", "operator": "eq", "value": SALES_UUID}])
        );
    }

    let result = call_ok(
        &registry,
        "list_dashboards",
        json!({"filters": [{"column": "uuid", "operator": "in", "value": [upper]}]}),
    )
    .await;
    assert_eq!(result["total_count"], 1);
    assert_eq!(result["filters_applied"][0]["value"], json!([SALES_UUID]));
}

#[tokio::test]
async fn test_projection() {
    let registry = registry();
    let result = call_ok(
        &registry,
        "list_dashboards",
        json!({"select_columns": "id,dashboard_title", "page_size": 2}),
    )
    .await;

    assert_eq!(result["columns_requested"], json!(["id", "dashboard_title"]));
    for item in result["items"].as_array().unwrap() {
        let mut keys: Vec<&str> = item.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["dashboard_title", "id"]);
    }
}

#[tokio::test]
async fn test_page_size_one_walks_every_page() {
    let registry = registry();
    let mut seen = Vec::new();

    for page in 1..=5 {
        let result = call_ok(
            &registry,
            "list_dashboards",
            json!({"page": page, "page_size": 1, "order_column": "id", "order_direction": "asc"}),
        )
        .await;
        assert_eq!(result["total_pages"], 5);
        assert_eq!(result["has_previous"], page > 1);
        assert_eq!(result["has_next"], page < 5);
        seen.push(result["items"][0]["id"].as_i64().unwrap());
    }

    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let registry = registry();
    let result = call_ok(&registry, "list_dashboards", json!({"search": "HEALTH"})).await;
    assert_eq!(result["total_count"], 1);
    assert_eq!(result["items"][0]["dashboard_title"], "Ops Health");
}

#[tokio::test]
async fn test_empty_select_columns_rejected() {
    let (registry, calls) = recording_registry(Arc::new(AllowAll));
    let payload = call_err(&registry, "list_dashboards", json!({"select_columns": []})).await;

    assert_eq!(payload["error_type"], "validation_error");
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_operator_rejected() {
    let registry = registry();
    let payload = call_err(
        &registry,
        "list_charts",
        json!({"filters": [{"column": "viz_type", "operator": "regex", "value": "b.*"}]}),
    )
    .await;
    assert_eq!(payload["error_type"], "validation_error");

    let payload = call_err(
        &registry,
        "list_charts",
        json!({"filters": [{"column": "viz_type", "operator": "gt", "value": "bar"}]}),
    )
    .await;
    assert_eq!(payload["error_type"], "validation_error");
}

#[tokio::test]
async fn test_enumerated_column_filter() {
    let registry = registry();
    let result = call_ok(
        &registry,
        "list_charts",
        json!({"filters": [{"column": "datasource_type", "operator": "eq", "value": "query"}]}),
    )
    .await;
    assert_eq!(result["total_count"], 1);
    assert_eq!(result["items"][0]["slice_name"], "Tickets");

    let payload = call_err(
        &registry,
        "list_charts",
        json!({"filters": [{"column": "datasource_type", "operator": "eq", "value": "spreadsheet"}]}),
    )
    .await;
    assert_eq!(payload["error_type"], "validation_error");
}

// =============================================================================
// Get info
// =============================================================================

#[tokio::test]
async fn test_uuid_routes_only_to_uuid_lookup() {
    let (registry, calls) = recording_registry(Arc::new(AllowAll));
    let result = call_ok(&registry, "get_dashboard_info", json!({"identifier": SALES_UUID})).await;

    assert_eq!(result["id"], 1);
    assert_eq!(result["uuid"], SALES_UUID);
    assert_eq!(*calls.lock().unwrap(), vec!["find_by_uuid"]);
}

#[tokio::test]
async fn test_slug_lookup() {
    let (registry, calls) = recording_registry(Arc::new(AllowAll));
    let result = call_ok(&registry, "get_dashboard_info", json!({"identifier": "ops"})).await;

    assert_eq!(result["id"], 2);
    assert_eq!(result["dashboard_title"], "Ops Health");
    assert_eq!(*calls.lock().unwrap(), vec!["find_by_slug"]);
}

#[tokio::test]
async fn test_numeric_text_routes_to_id() {
    let (registry, calls) = recording_registry(Arc::new(AllowAll));
    let result = call_ok(&registry, "get_dashboard_info", json!({"identifier": "3"})).await;

    assert_eq!(result["dashboard_title"], "Finance");
    assert_eq!(*calls.lock().unwrap(), vec!["find_by_id"]);
}

#[tokio::test]
async fn test_missing_uuid_is_not_found() {
    let registry = registry();
    let missing = "ffffffff-1f2d-4e6a-9b3c-5d7e8f9a0b1c";
    let payload = call_err(&registry, "get_dashboard_info", json!({"identifier": missing})).await;

    assert_eq!(payload["error_type"], "not_found");
    assert!(payload["error"].as_str().unwrap().contains(missing));
}

#[tokio::test]
async fn test_non_slug_text_is_not_found_for_charts() {
    let registry = registry();
    let payload = call_err(&registry, "get_chart_info", json!({"identifier": "revenue"})).await;
    assert_eq!(payload["error_type"], "not_found");
}

#[tokio::test]
async fn test_dataset_detail_is_wrapped() {
    let registry = registry();
    let result = call_ok(&registry, "get_dataset_info", json!({"identifier": 100})).await;
    assert_eq!(result["dataset"]["table_name"], "orders");
}

// =============================================================================
// Available filters
// =============================================================================

#[tokio::test]
async fn test_available_filters_are_stable() {
    let registry = registry();
    let first = call_ok(&registry, "get_chart_available_filters", json!({})).await;
    let second = call_ok(&registry, "get_chart_available_filters", json!({})).await;

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert!(first["filters"]["datasource_type"]["values"].is_array());
}

#[tokio::test]
async fn test_advertised_filters_are_accepted() {
    let registry = registry();
    let filters = call_ok(&registry, "get_dashboard_available_filters", json!({})).await;

    let spec = &filters["filters"]["dashboard_title"];
    let operator = spec["operators"][0].clone();
    let value = if operator == "in" || operator == "nin" {
        json!(["Finance"])
    } else {
        json!("Finance")
    };

    call_ok(
        &registry,
        "list_dashboards",
        json!({"filters": [{"column": "dashboard_title", "operator": operator, "value": value}]}),
    )
    .await;
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_denied_call_never_reaches_dao() {
    let deny = |_tool: &str, _caller: &CallerIdentity| AuthDecision::access_denied("Access denied");
    let (registry, calls) = recording_registry(Arc::new(deny));

    for (tool, args) in [
        ("list_dashboards", json!({})),
        ("get_dashboard_info", json!({"identifier": 1})),
        ("get_dashboard_available_filters", json!({})),
        ("get_instance_info", json!({})),
    ] {
        let payload = call_err(&registry, tool, args).await;
        assert_eq!(payload["error_type"], "access_denied", "{}", tool);
    }

    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_validation_runs_before_auth() {
    let deny = |_tool: &str, _caller: &CallerIdentity| AuthDecision::authorization_failed("no");
    let registry = registry_with(&catalog(), Arc::new(deny));

    let payload = call_err(&registry, "list_dashboards", json!({"page": 0})).await;
    assert_eq!(payload["error_type"], "validation_error");
}

#[tokio::test]
async fn test_unknown_tool_is_not_an_envelope() {
    let registry = registry();
    let result = registry
        .call_tool("delete_dashboard", json!({}), &CallerIdentity::anonymous())
        .await;
    assert!(result.is_err());
}

// =============================================================================
// Server loop
// =============================================================================

#[tokio::test]
async fn test_server_loop_over_in_memory_io() {
    let mut config = McpServerConfig::default();
    config.audit_log_path = None;
    let mut server = McpServer::from_catalog(config, catalog()).unwrap();

    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
               "params": {"protocolVersion": "2024-11-05", "clientInfo": {"name": "e2e"}}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
               "params": {"name": "list_dashboards", "arguments": {"page_size": 2}}}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}),
    ]
    .iter()
    .map(|v| v.to_string())
    .collect::<Vec<_>>()
    .join("\n");

    let mut transport = McpTransport::new(input.as_bytes(), Vec::new());
    server.run(&mut transport).await.unwrap();
    let (_, output) = transport.into_inner();

    let responses: Vec<JsonRpcResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 3);

    let listed = responses[1].result.as_ref().unwrap();
    let text = listed["content"][0]["text"].as_str().unwrap();
    let envelope: Value = serde_json::from_str(text).unwrap();
    assert_eq!(envelope["count"], 2);
    assert_eq!(envelope["total_count"], 5);
}

#[tokio::test]
async fn test_audit_log_records_tool_calls() {
    let temp = tempfile::TempDir::new().unwrap();
    let audit_path = temp.path().join("audit.ndjson");

    let mut config = McpServerConfig::default();
    config.audit_log_path = Some(audit_path.clone());
    let mut server = McpServer::from_catalog(config, catalog()).unwrap();

    server
        .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#)
        .await;
    server
        .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_chart_info","arguments":{"identifier":404}}}"#)
        .await;

    let entries: Vec<Value> = std::fs::read_to_string(&audit_path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let tool_call = entries
        .iter()
        .find(|e| e["type"] == "tool_call")
        .unwrap();
    assert_eq!(tool_call["tool"], "get_chart_info");
    assert_eq!(tool_call["error_type"], "not_found");
    assert_eq!(tool_call["phase"], "executed");
}
