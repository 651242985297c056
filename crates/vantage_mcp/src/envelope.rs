//! Response Envelope - Uniform List Response Shape
//!
//! One shape for every list tool. The pagination summary is carried both
//! flat and as a nested `pagination` block so clients can bind to either.
//!
//! Pages are 1-based: `has_previous = page > 1`, `has_next = page < total_pages`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::filters::FilterClause;

static LAST_TIMESTAMP_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Wall-clock timestamp for a response, never earlier than the previous one.
pub fn response_timestamp() -> DateTime<Utc> {
    let now = Utc::now().timestamp_micros();
    let prev = LAST_TIMESTAMP_MICROS.fetch_max(now, Ordering::SeqCst);
    let micros = prev.max(now);
    Utc.timestamp_micros(micros).single().unwrap_or_else(Utc::now)
}

/// Serde adapter: RFC 3339 with an explicit `+00:00` offset.
pub mod rfc3339 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        DateTime::<Utc>::deserialize(deserializer)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Nested pagination block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationBlock {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PaginationBlock {
    /// Compute the block for a 1-based page.
    pub fn compute(page: u32, page_size: u32, total_count: u64) -> Self {
        let total_pages = if page_size > 0 {
            total_count.div_ceil(u64::from(page_size))
        } else {
            0
        };
        Self {
            page,
            page_size,
            total_count,
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_previous: page > 1,
        }
    }
}

// =============================================================================
// List Envelope
// =============================================================================

/// Uniform list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEnvelope {
    pub items: Vec<Value>,
    pub count: usize,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub columns_requested: Vec<String>,
    pub columns_loaded: Vec<String>,
    pub filters_applied: Vec<FilterClause>,
    pub pagination: PaginationBlock,
    #[serde(with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
}

/// Inputs to [`ListEnvelope::build`] besides the serialized items.
#[derive(Debug, Clone)]
pub struct EnvelopeParts {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub columns_requested: Vec<String>,
    pub columns_loaded: Vec<String>,
    pub filters_applied: Vec<FilterClause>,
}

impl ListEnvelope {
    pub fn build(items: Vec<Value>, parts: EnvelopeParts) -> Self {
        let pagination = PaginationBlock::compute(parts.page, parts.page_size, parts.total_count);
        Self {
            count: items.len(),
            items,
            total_count: parts.total_count,
            page: parts.page,
            page_size: parts.page_size,
            total_pages: pagination.total_pages,
            has_previous: pagination.has_previous,
            has_next: pagination.has_next,
            columns_requested: parts.columns_requested,
            columns_loaded: parts.columns_loaded,
            filters_applied: parts.filters_applied,
            pagination,
            timestamp: response_timestamp(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result() {
        let p = PaginationBlock::compute(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_previous);
    }

    #[test]
    fn test_page_size_one_yields_one_page_per_item() {
        let first = PaginationBlock::compute(1, 1, 5);
        assert_eq!(first.total_pages, 5);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last = PaginationBlock::compute(5, 1, 5);
        assert!(!last.has_next);
        assert!(last.has_previous);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(PaginationBlock::compute(1, 10, 21).total_pages, 3);
        assert_eq!(PaginationBlock::compute(1, 10, 20).total_pages, 2);
        assert_eq!(PaginationBlock::compute(1, 0, 20).total_pages, 0);
    }

    #[test]
    fn test_middle_page() {
        let p = PaginationBlock::compute(2, 10, 25);
        assert!(p.has_next);
        assert!(p.has_previous);
    }

    #[test]
    fn test_envelope_flat_and_nested_agree() {
        let env = ListEnvelope::build(
            vec![serde_json::json!({"id": 1})],
            EnvelopeParts {
                page: 1,
                page_size: 1,
                total_count: 3,
                columns_requested: vec!["id".into()],
                columns_loaded: vec!["id".into()],
                filters_applied: vec![],
            },
        );
        assert_eq!(env.count, 1);
        assert_eq!(env.total_pages, env.pagination.total_pages);
        assert_eq!(env.has_next, env.pagination.has_next);
        assert_eq!(env.has_previous, env.pagination.has_previous);

        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["filters_applied"], serde_json::json!([]));
        assert_eq!(json["pagination"]["total_count"], 3);
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut prev = response_timestamp();
        for _ in 0..100 {
            let next = response_timestamp();
            assert!(next >= prev);
            prev = next;
        }
    }
}
