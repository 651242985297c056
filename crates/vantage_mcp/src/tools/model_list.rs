//! list_<resources> - Generic List Engine
//!
//! Filters, free-text search, ordering, pagination and column projection
//! over one resource's DAO, wrapped in the uniform [`ListEnvelope`].

use super::{parse_args, ListLimits, McpTool};
use crate::auth::{Authorized, CallContext};
use crate::dao::{ListQuery, ModelDao, OrderDirection};
use crate::envelope::{EnvelopeParts, ListEnvelope};
use crate::error::ToolError;
use crate::filters::{FilterClause, FiltersInput};
use crate::resource::{default_columns, search_columns, Resource};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default sort key: last modification time.
pub const DEFAULT_ORDER_COLUMN: &str = "changed_on";

/// Arguments of a list tool. Unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListRequest {
    #[serde(default)]
    pub filters: Option<FiltersInput>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub select_columns: Option<ColumnsInput>,
    #[serde(default)]
    pub order_column: Option<String>,
    #[serde(default)]
    pub order_direction: Option<OrderDirection>,
    /// 1-based
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: Option<u32>,
}

fn default_page() -> u32 {
    1
}

/// `select_columns` as comma-separated text or a list of names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ColumnsInput {
    Text(String),
    List(Vec<String>),
}

impl ColumnsInput {
    fn into_columns(self) -> Result<Vec<String>, ToolError> {
        let columns: Vec<String> = match self {
            ColumnsInput::Text(text) => text.split(',').map(|c| c.trim().to_string()).collect(),
            ColumnsInput::List(list) => list.into_iter().map(|c| c.trim().to_string()).collect(),
        };
        if columns.is_empty() {
            return Err(ToolError::validation("select_columns must name at least one column"));
        }
        if columns.iter().any(|c| c.is_empty()) {
            return Err(ToolError::validation("select_columns contains an empty column name"));
        }
        Ok(columns)
    }
}

/// Normalized request, ready for the DAO.
#[derive(Debug)]
struct Prepared {
    query: ListQuery,
    columns_requested: Vec<String>,
    filters: Vec<FilterClause>,
}

pub struct ModelListTool<R: Resource> {
    name: String,
    description: String,
    dao: Arc<dyn ModelDao<R::Entity>>,
    limits: ListLimits,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ModelListTool<R> {
    pub fn new(dao: Arc<dyn ModelDao<R::Entity>>, limits: ListLimits) -> Self {
        Self {
            name: format!("list_{}", R::PLURAL),
            description: format!(
                "List {} with filtering, search, ordering, pagination and column selection",
                R::PLURAL
            ),
            dao,
            limits,
            _resource: PhantomData,
        }
    }

    /// Steps 1-2: normalize columns, filters and paging. No I/O.
    fn prepare(&self, request: ListRequest) -> Result<Prepared, ToolError> {
        let vocabulary = R::vocabulary();

        let columns_to_load = match request.select_columns {
            Some(input) => input.into_columns()?,
            None => default_columns::<R>(),
        };
        if let Some(unknown) = columns_to_load.iter().find(|c| !vocabulary.is_projectable(c)) {
            return Err(ToolError::validation(format!(
                "unknown column '{}' in select_columns",
                unknown
            )));
        }

        let filters = match request.filters {
            Some(input) => input.into_clauses()?,
            None => Vec::new(),
        };
        let filters = vocabulary.normalize_all(filters)?;

        let order_column = request
            .order_column
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| DEFAULT_ORDER_COLUMN.to_string());
        if vocabulary.get(&order_column).is_none() {
            return Err(ToolError::validation(format!(
                "cannot order by '{}': not a sortable column",
                order_column
            )));
        }

        if request.page == 0 {
            return Err(ToolError::validation("page must be >= 1 (pages are 1-based)"));
        }
        let page_size = match request.page_size {
            Some(0) => return Err(ToolError::validation("page_size must be >= 1")),
            Some(size) if size > self.limits.max_page_size => {
                warn!(
                    tool = %self.name,
                    requested = size,
                    max = self.limits.max_page_size,
                    "Clamping page_size"
                );
                self.limits.max_page_size
            }
            Some(size) => size,
            None => self.limits.default_page_size,
        };

        let search = request
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Prepared {
            query: ListQuery {
                column_operators: filters.clone(),
                order_column,
                order_direction: request.order_direction.unwrap_or_default(),
                page: request.page,
                page_size,
                search,
                search_columns: search_columns::<R>(),
                custom_filters: None,
                columns: columns_to_load.clone(),
            },
            columns_requested: columns_to_load,
            filters,
        })
    }

    /// Steps 3-6: DAO, serialization, envelope.
    async fn list(&self, prepared: Prepared, _proof: Authorized) -> Result<ListEnvelope, ToolError> {
        let Prepared {
            query,
            columns_requested,
            filters,
        } = prepared;

        debug!(
            tool = %self.name,
            filters = query.column_operators.len(),
            search = ?query.search,
            order = %format!("{} {}", query.order_column, query.order_direction),
            page = query.page,
            page_size = query.page_size,
            "Listing"
        );

        let (entities, total_count) = self.dao.list(&query).await?;

        let items: Vec<Value> = entities
            .iter()
            .filter_map(|entity| R::serialize_list(entity, &query.columns))
            .collect();
        if items.len() < entities.len() {
            debug!(
                tool = %self.name,
                dropped = entities.len() - items.len(),
                "Skipped unrepresentable entities"
            );
        }

        let envelope = ListEnvelope::build(
            items,
            EnvelopeParts {
                page: query.page,
                page_size: query.page_size,
                total_count,
                columns_requested,
                columns_loaded: query.columns,
                filters_applied: filters,
            },
        );

        info!(
            tool = %self.name,
            count = envelope.count,
            total_count = envelope.total_count,
            "Listed {}",
            R::PLURAL
        );
        Ok(envelope)
    }
}

#[async_trait]
impl<R: Resource> McpTool for ModelListTool<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        let vocabulary = R::vocabulary();
        let filter_columns: Vec<&String> = vocabulary.columns().keys().collect();
        let operators: Vec<&str> = vocabulary.operators().iter().map(|op| op.as_str()).collect();

        json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "filters": {
                    "description": "Filter clauses, AND-ed. May also be sent as a JSON-encoded string.",
                    "oneOf": [
                        { "type": "string" },
                        {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["column", "operator"],
                                "properties": {
                                    "column": { "type": "string", "enum": filter_columns },
                                    "operator": { "type": "string", "enum": operators },
                                    "value": {}
                                }
                            }
                        }
                    ]
                },
                "search": {
                    "type": "string",
                    "description": format!("Case-insensitive substring match over {}", R::SEARCH_COLUMNS.join(", "))
                },
                "select_columns": {
                    "description": "Columns to include in each item (comma-separated text or list)",
                    "oneOf": [
                        { "type": "string" },
                        {
                            "type": "array",
                            "minItems": 1,
                            "items": { "type": "string", "enum": vocabulary.projectable_columns() }
                        }
                    ]
                },
                "order_column": {
                    "type": "string",
                    "enum": vocabulary.columns().keys().collect::<Vec<_>>(),
                    "default": DEFAULT_ORDER_COLUMN
                },
                "order_direction": { "type": "string", "enum": ["asc", "desc"], "default": "desc" },
                "page": { "type": "integer", "minimum": 1, "default": 1 },
                "page_size": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": self.limits.max_page_size,
                    "default": self.limits.default_page_size
                }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &CallContext<'_>) -> Result<Value, ToolError> {
        let request: ListRequest = parse_args(args)?;
        let prepared = self.prepare(request)?;
        let proof = ctx.authorize()?;
        let envelope = self.list(prepared, proof).await?;
        Ok(serde_json::to_value(envelope)?)
    }
}
