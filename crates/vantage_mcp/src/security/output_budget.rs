//! Output Budget - Response Size Limits
//!
//! Bounds the serialized size of one tool result. Oversized results are
//! replaced by a small, valid JSON notice telling the caller to paginate,
//! never cut mid-document.
//!
//! # Defaults
//!
//! - Max response size: 1MB

use super::SecurityError;
use serde_json::json;
use tracing::warn;

/// Message carried by the truncation notice.
pub const TRUNCATION_MESSAGE: &str =
    "Response exceeded size limit. Use pagination, filters or select_columns to reduce output.";

/// Output budget for limiting response sizes
#[derive(Debug, Clone)]
pub struct OutputBudget {
    /// Maximum response size in bytes
    max_bytes: usize,
}

/// Content after the budget has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budgeted {
    pub content: String,
    pub truncated: bool,
}

impl OutputBudget {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Default budget (1MB)
    pub fn default_budget() -> Self {
        Self::new(1024 * 1024)
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check if response size is within budget
    pub fn check_size(&self, size: usize) -> Result<(), SecurityError> {
        if size > self.max_bytes {
            Err(SecurityError::OutputTooLarge {
                size,
                max: self.max_bytes,
            })
        } else {
            Ok(())
        }
    }

    /// Pass `content` through, or replace it with a truncation notice.
    pub fn enforce(&self, content: String) -> Budgeted {
        match self.check_size(content.len()) {
            Ok(()) => Budgeted {
                content,
                truncated: false,
            },
            Err(err) => {
                warn!("Response truncated: {}", err);
                let notice = json!({
                    "truncated": true,
                    "max_bytes": self.max_bytes,
                    "original_bytes": content.len(),
                    "message": TRUNCATION_MESSAGE,
                });
                Budgeted {
                    content: notice.to_string(),
                    truncated: true,
                }
            }
        }
    }
}

impl Default for OutputBudget {
    fn default() -> Self {
        Self::default_budget()
    }
}
