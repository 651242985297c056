//! In-memory DAO
//!
//! A complete [`ModelDao`] over a `Vec` of entities. Used by the CLI when
//! serving a JSON catalog and by the integration tests.
//!
//! Semantics follow the DAO contract: clauses are AND-ed, search is a
//! case-insensitive substring match OR-ed across the search columns, nulls
//! sort last in either direction, ties break on ascending id, and pages
//! are 1-based. As in SQL, a null attribute matches only `is_null`: it
//! never satisfies a comparison, `ne` or `nin`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{DaoError, ListQuery, ModelDao, OrderDirection};
use crate::filters::{FilterClause, FilterVocabulary, Operator};
use crate::resources::{Chart, Dashboard, Dataset};

/// Explicit attribute access for entities held by [`MemoryDao`].
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> i64;

    fn uuid(&self) -> Option<Uuid>;

    fn slug(&self) -> Option<&str> {
        None
    }

    /// Value of a filterable / sortable / searchable column.
    fn attribute(&self, column: &str) -> Option<Value>;
}

/// In-memory DAO.
#[derive(Debug, Clone)]
pub struct MemoryDao<E> {
    records: Arc<Vec<E>>,
    slugs: bool,
    vocabulary: Option<FilterVocabulary>,
}

impl<E: Record> MemoryDao<E> {
    pub fn new(records: Vec<E>) -> Self {
        Self {
            records: Arc::new(records),
            slugs: false,
            vocabulary: None,
        }
    }

    /// Enable `find_by_slug`.
    pub fn with_slugs(mut self) -> Self {
        self.slugs = true;
        self
    }

    /// Publish an introspected vocabulary through `filterable_columns`.
    pub fn with_vocabulary(mut self, vocabulary: FilterVocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matches(&self, record: &E, query: &ListQuery) -> bool {
        let clauses_ok = query
            .column_operators
            .iter()
            .all(|clause| clause_matches(record, clause));
        if !clauses_ok {
            return false;
        }

        match query.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let needle = term.to_lowercase();
                query.search_columns.iter().any(|column| {
                    match record.attribute(column) {
                        Some(Value::String(s)) => s.to_lowercase().contains(&needle),
                        _ => false,
                    }
                })
            }
            _ => true,
        }
    }
}

#[async_trait]
impl<E: Record> ModelDao<E> for MemoryDao<E> {
    async fn list(&self, query: &ListQuery) -> Result<(Vec<E>, u64), DaoError> {
        if query.page == 0 {
            return Err(DaoError::Backend("page is 1-based".to_string()));
        }

        let mut matched: Vec<&E> = self
            .records
            .iter()
            .filter(|record| self.matches(record, query))
            .collect();

        matched.sort_by(|a, b| {
            let left = a.attribute(&query.order_column).unwrap_or(Value::Null);
            let right = b.attribute(&query.order_column).unwrap_or(Value::Null);
            compare_for_order(&left, &right, query.order_direction).then_with(|| a.id().cmp(&b.id()))
        });

        let total = matched.len() as u64;
        let offset = (query.page as usize - 1).saturating_mul(query.page_size as usize);
        let page: Vec<E> = matched
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .cloned()
            .collect();

        debug!(
            total,
            returned = page.len(),
            page = query.page,
            page_size = query.page_size,
            "MemoryDao list"
        );
        Ok((page, total))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, DaoError> {
        Ok(self.records.iter().find(|r| r.id() == id).cloned())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<E>, DaoError> {
        Ok(self.records.iter().find(|r| r.uuid() == Some(uuid)).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>, DaoError> {
        if !self.slugs {
            return Err(DaoError::Unsupported("find_by_slug"));
        }
        Ok(self
            .records
            .iter()
            .find(|r| r.slug() == Some(slug) || r.id().to_string() == slug)
            .cloned())
    }

    fn filterable_columns(&self) -> Option<FilterVocabulary> {
        self.vocabulary.clone()
    }

    async fn count(&self) -> Result<u64, DaoError> {
        Ok(self.records.len() as u64)
    }
}

// =============================================================================
// Clause evaluation
// =============================================================================

fn clause_matches<E: Record>(record: &E, clause: &FilterClause) -> bool {
    let actual = record.attribute(&clause.column).unwrap_or(Value::Null);
    let expected = &clause.value;

    match clause.operator {
        Operator::IsNull => actual.is_null(),
        Operator::IsNotNull => !actual.is_null(),
        Operator::Eq => !actual.is_null() && compare(&actual, expected) == Some(Ordering::Equal),
        Operator::Ne => !actual.is_null() && compare(&actual, expected) != Some(Ordering::Equal),
        Operator::Gt => compare(&actual, expected) == Some(Ordering::Greater),
        Operator::Gte => matches!(compare(&actual, expected), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => compare(&actual, expected) == Some(Ordering::Less),
        Operator::Lte => matches!(compare(&actual, expected), Some(Ordering::Less | Ordering::Equal)),
        Operator::In => in_list(&actual, expected),
        Operator::Nin => !actual.is_null() && !in_list(&actual, expected),
        Operator::Sw => text_pair(&actual, expected)
            .map(|(a, e)| a.to_lowercase().starts_with(&e.to_lowercase()))
            .unwrap_or(false),
        Operator::Ew => text_pair(&actual, expected)
            .map(|(a, e)| a.to_lowercase().ends_with(&e.to_lowercase()))
            .unwrap_or(false),
        Operator::Like => text_pair(&actual, expected)
            .map(|(a, e)| like_match(a, e))
            .unwrap_or(false),
        Operator::Ilike => text_pair(&actual, expected)
            .map(|(a, e)| like_match(&a.to_lowercase(), &e.to_lowercase()))
            .unwrap_or(false),
    }
}

fn in_list(actual: &Value, expected: &Value) -> bool {
    expected
        .as_array()
        .map(|items| {
            items
                .iter()
                .any(|item| compare(actual, item) == Some(Ordering::Equal))
        })
        .unwrap_or(false)
}

fn text_pair<'a>(actual: &'a Value, expected: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((actual.as_str()?, expected.as_str()?))
}

fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Compare two non-null scalars of compatible types.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return Some(x.cmp(&y));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => match (as_datetime(a), as_datetime(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(x.as_str().cmp(y.as_str())),
        },
        _ => None,
    }
}

fn compare_for_order(a: &Value, b: &Value, direction: OrderDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = compare(a, b).unwrap_or(Ordering::Equal);
            match direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// SQL `LIKE`: `%` matches any run, `_` matches one character.
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // dp[j]: pattern[..i] matches text[..j]
    let mut dp = vec![false; text.len() + 1];
    dp[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= dp[j];
                    next[j] = seen;
                }
            }
            '_' => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1];
                }
            }
            c => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1] && text[j - 1] == *c;
                }
            }
        }
        dp = next;
    }
    dp[text.len()]
}

// =============================================================================
// Catalog
// =============================================================================

/// Entities for all three resources, loadable from one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub dashboards: Vec<Dashboard>,
    #[serde(default)]
    pub charts: Vec<Chart>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

impl Catalog {
    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        debug!(
            dashboards = catalog.dashboards.len(),
            charts = catalog.charts.len(),
            datasets = catalog.datasets.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub fn dashboard_dao(&self) -> MemoryDao<Dashboard> {
        MemoryDao::new(self.dashboards.clone()).with_slugs()
    }

    pub fn chart_dao(&self) -> MemoryDao<Chart> {
        MemoryDao::new(self.charts.clone())
    }

    pub fn dataset_dao(&self) -> MemoryDao<Dataset> {
        MemoryDao::new(self.datasets.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
