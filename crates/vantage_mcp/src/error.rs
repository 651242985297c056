//! Tool error types and the error envelope
//!
//! Every expected failure a tool can produce maps onto one member of the
//! closed [`ErrorType`] set. Unknown tools are the only failure that never
//! becomes an envelope: the registry rejects them before any engine runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::dao::DaoError;
use crate::envelope::response_timestamp;
use crate::filters::FilterError;

/// Message returned to clients for `internal_error` responses.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

// =============================================================================
// Error Type (closed set)
// =============================================================================

/// Closed set of error kinds carried by [`ErrorEnvelope::error_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    ValidationError,
    NotFound,
    AccessDenied,
    AuthorizationFailed,
    InternalError,
}

impl ErrorType {
    pub const ALL: [ErrorType; 5] = [
        ErrorType::ValidationError,
        ErrorType::NotFound,
        ErrorType::AccessDenied,
        ErrorType::AuthorizationFailed,
        ErrorType::InternalError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ValidationError => "validation_error",
            ErrorType::NotFound => "not_found",
            ErrorType::AccessDenied => "access_denied",
            ErrorType::AuthorizationFailed => "authorization_failed",
            ErrorType::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Error Envelope
// =============================================================================

/// Uniform error response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub error_type: ErrorType,
    #[serde(with = "crate::envelope::rfc3339")]
    pub timestamp: DateTime<Utc>,
}

impl ErrorEnvelope {
    pub fn new(error_type: ErrorType, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_type,
            timestamp: response_timestamp(),
        }
    }
}

// =============================================================================
// Tool Errors
// =============================================================================

/// Errors that can occur while dispatching or executing a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Malformed request, bad filter, bad JSON
    #[error("Validation error: {0}")]
    Validation(String),

    /// Identifier resolved to no entity
    #[error("{0}")]
    NotFound(String),

    /// Auth hook refused (no usable credentials)
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Auth hook refused (credentials rejected)
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Unhandled failure in a DAO, serializer or engine
    #[error("Internal error: {0}")]
    Internal(String),

    /// No tool is registered under this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl ToolError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Error kind reported to the client.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ToolError::Validation(_) | ToolError::UnknownTool(_) => ErrorType::ValidationError,
            ToolError::NotFound(_) => ErrorType::NotFound,
            ToolError::AccessDenied(_) => ErrorType::AccessDenied,
            ToolError::AuthorizationFailed(_) => ErrorType::AuthorizationFailed,
            ToolError::Internal(_) => ErrorType::InternalError,
        }
    }

    /// Render as the client-facing envelope.
    ///
    /// Internal causes are replaced by a generic message; callers log the
    /// original before converting.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let message = match self {
            ToolError::Validation(msg) => format!("Validation error: {}", msg),
            ToolError::NotFound(msg) => msg.clone(),
            ToolError::AccessDenied(msg) | ToolError::AuthorizationFailed(msg) => msg.clone(),
            ToolError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            ToolError::UnknownTool(name) => format!("Unknown tool: {}", name),
        };
        ErrorEnvelope::new(self.error_type(), message)
    }
}

impl From<FilterError> for ToolError {
    fn from(err: FilterError) -> Self {
        ToolError::Validation(err.to_string())
    }
}

impl From<DaoError> for ToolError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound(msg) => ToolError::NotFound(msg),
            other => ToolError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Internal(format!("Serialization error: {}", err))
    }
}

// =============================================================================
// Tests
// =============================================================================
