//! MCP Tool Implementations
//!
//! Each tool binds one generic engine to one resource. Tools are registered
//! in the [`ToolRegistry`] at startup and dispatched by name.
//!
//! # Tools
//!
//! - **List**: `list_dashboards`, `list_charts`, `list_datasets`
//! - **Get**: `get_dashboard_info`, `get_chart_info`, `get_dataset_info`
//! - **Filters**: `get_dashboard_available_filters`, `get_chart_available_filters`,
//!   `get_dataset_available_filters`
//! - **Service**: `health_check`, `get_instance_info`
//!
//! Every tool validates its arguments, then runs the auth hook through the
//! [`CallContext`], then executes.

mod health;
mod instance_info;
mod model_filters;
mod model_get_info;
mod model_list;
mod registry;

pub use health::HealthCheckTool;
pub use instance_info::InstanceInfoTool;
pub use model_filters::ModelGetAvailableFiltersTool;
pub use model_get_info::{GetRequest, ModelGetInfoTool};
pub use model_list::{ListRequest, ModelListTool};
pub use registry::{ToolRegistry, ToolResponse};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::{AuthHook, CallContext};
use crate::dao::ModelDao;
use crate::error::ToolError;
use crate::memory::Catalog;
use crate::protocol::ToolDefinition;
use crate::resources::{Chart, ChartResource, Dashboard, DashboardResource, Dataset, DatasetResource};

/// Trait for MCP tools
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "list_dashboards")
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Validate `args`, authorize through `ctx`, then execute.
    async fn execute(&self, args: Value, ctx: &CallContext<'_>) -> Result<Value, ToolError>;

    /// Get the tool definition for tools/list
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Page size bounds applied by the list tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

/// DAOs for the three built-in resources.
#[derive(Clone)]
pub struct ResourceDaos {
    pub dashboards: Arc<dyn ModelDao<Dashboard>>,
    pub charts: Arc<dyn ModelDao<Chart>>,
    pub datasets: Arc<dyn ModelDao<Dataset>>,
}

impl ResourceDaos {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            dashboards: Arc::new(catalog.dashboard_dao()),
            charts: Arc::new(catalog.chart_dao()),
            datasets: Arc::new(catalog.dataset_dao()),
        }
    }
}

/// Registry with every built-in tool registered.
pub fn create_default_registry(
    daos: ResourceDaos,
    auth: Arc<dyn AuthHook>,
    limits: ListLimits,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new(auth);

    registry.register(Box::new(ModelListTool::<DashboardResource>::new(daos.dashboards.clone(), limits)));
    registry.register(Box::new(ModelGetInfoTool::<DashboardResource>::new(daos.dashboards.clone())));
    registry.register(Box::new(ModelGetAvailableFiltersTool::<DashboardResource>::new(
        daos.dashboards.clone(),
    )));

    registry.register(Box::new(ModelListTool::<ChartResource>::new(daos.charts.clone(), limits)));
    registry.register(Box::new(ModelGetInfoTool::<ChartResource>::new(daos.charts.clone())));
    registry.register(Box::new(ModelGetAvailableFiltersTool::<ChartResource>::new(
        daos.charts.clone(),
    )));

    registry.register(Box::new(ModelListTool::<DatasetResource>::new(daos.datasets.clone(), limits)));
    registry.register(Box::new(ModelGetInfoTool::<DatasetResource>::new(daos.datasets.clone())));
    registry.register(Box::new(ModelGetAvailableFiltersTool::<DatasetResource>::new(
        daos.datasets.clone(),
    )));

    registry.register(Box::new(HealthCheckTool::new(env!("CARGO_PKG_VERSION"))));
    registry.register(Box::new(InstanceInfoTool::new(daos)));

    registry
}

/// Deserialize tool arguments, mapping failures to `validation_error`.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::validation(e.to_string()))
}
