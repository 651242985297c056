//! Security Subsystem
//!
//! Controls applied around tool dispatch:
//! - Output budget: bounds the size of one tool result
//! - Audit logging: records every request, response and tool call
//!
//! Authorization itself is delegated to the auth hook (see [`crate::auth`]).

mod audit;
mod output_budget;

pub use audit::AuditLog;
pub use output_budget::{Budgeted, OutputBudget};

/// Combined security configuration
#[derive(Debug)]
pub struct SecurityConfig {
    /// Output size limits
    pub output_budget: OutputBudget,

    /// Audit logging (optional)
    pub audit_log: Option<AuditLog>,
}

impl SecurityConfig {
    pub fn new(output_budget: OutputBudget, audit_log: Option<AuditLog>) -> Self {
        Self {
            output_budget,
            audit_log,
        }
    }
}

/// Security-related errors
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Output exceeds budget: {size} bytes > {max} bytes")]
    OutputTooLarge { size: usize, max: usize },

    #[error("Audit log error: {0}")]
    AuditError(String),
}
