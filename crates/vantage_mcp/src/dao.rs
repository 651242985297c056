//! DAO contract consumed by the engines
//!
//! A DAO owns query composition and I/O for one resource. The engines only
//! ever read through this trait; every method is a potential suspension
//! point and nothing else in the dispatch path awaits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::filters::{FilterClause, FilterVocabulary};

/// Ordering direction for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => f.write_str("asc"),
            OrderDirection::Desc => f.write_str("desc"),
        }
    }
}

/// Normalized list query handed to [`ModelDao::list`].
///
/// `column_operators` are AND-ed; `search` is a case-insensitive substring
/// match OR-ed across `search_columns` and AND-ed with the clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub column_operators: Vec<FilterClause>,
    pub order_column: String,
    pub order_direction: OrderDirection,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub search_columns: Vec<String>,
    pub custom_filters: Option<serde_json::Value>,
    /// Projection hint
    pub columns: Vec<String>,
}

impl ListQuery {
    /// Unfiltered first page, used for counting.
    pub fn count_only(order_column: &str) -> Self {
        Self {
            column_operators: Vec::new(),
            order_column: order_column.to_string(),
            order_direction: OrderDirection::Desc,
            page: 1,
            page_size: 1,
            search: None,
            search_columns: Vec::new(),
            custom_filters: None,
            columns: Vec::new(),
        }
    }
}

/// DAO failures.
#[derive(Debug, Error)]
pub enum DaoError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The DAO does not offer this lookup (e.g. slugs)
    #[error("Unsupported DAO operation: {0}")]
    Unsupported(&'static str),

    #[error("DAO backend error: {0}")]
    Backend(String),
}

/// Data access for one resource.
#[async_trait]
pub trait ModelDao<E>: Send + Sync {
    /// Filtered, searched, ordered page plus the count before pagination.
    async fn list(&self, query: &ListQuery) -> Result<(Vec<E>, u64), DaoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, DaoError>;

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<E>, DaoError>;

    /// Match on slug or textual id.
    async fn find_by_slug(&self, _slug: &str) -> Result<Option<E>, DaoError> {
        Err(DaoError::Unsupported("find_by_slug"))
    }

    /// Introspected vocabulary, when the DAO publishes one.
    fn filterable_columns(&self) -> Option<FilterVocabulary> {
        None
    }

    /// Total number of entities.
    async fn count(&self) -> Result<u64, DaoError> {
        let (_, total) = self.list(&ListQuery::count_only("id")).await?;
        Ok(total)
    }
}
