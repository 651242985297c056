//! Auth Hook
//!
//! Every tool invocation passes through a pluggable [`AuthHook`] before any
//! engine touches a DAO. The core never inspects roles or permissions; it
//! only guarantees the hook ran, by requiring an [`Authorized`] proof value
//! that can only be obtained from [`CallContext::authorize`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

use crate::error::ToolError;

/// Ambient caller identity, as far as the transport knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Client name reported on `initialize`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,

    /// Authenticated user, when the host knows one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Raw API key or `Bearer <key>` authorization value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// API key with any `Bearer ` scheme prefix removed.
    pub fn bearer_token(&self) -> Option<&str> {
        let raw = self.api_key.as_deref()?.trim();
        let token = raw
            .strip_prefix("Bearer ")
            .or_else(|| raw.strip_prefix("bearer "))
            .unwrap_or(raw)
            .trim();
        (!token.is_empty()).then_some(token)
    }
}

/// Why a hook refused a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyKind {
    /// No usable credentials were presented
    AccessDenied,
    /// Credentials were presented and rejected
    AuthorizationFailed,
}

/// Verdict of an auth hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Proceed,
    Deny { kind: DenyKind, message: String },
}

impl AuthDecision {
    pub fn access_denied(message: impl Into<String>) -> Self {
        AuthDecision::Deny {
            kind: DenyKind::AccessDenied,
            message: message.into(),
        }
    }

    pub fn authorization_failed(message: impl Into<String>) -> Self {
        AuthDecision::Deny {
            kind: DenyKind::AuthorizationFailed,
            message: message.into(),
        }
    }
}

/// Pluggable authorization capability.
pub trait AuthHook: Send + Sync {
    fn check(&self, tool_name: &str, caller: &CallerIdentity) -> AuthDecision;
}

impl<F> AuthHook for F
where
    F: Fn(&str, &CallerIdentity) -> AuthDecision + Send + Sync,
{
    fn check(&self, tool_name: &str, caller: &CallerIdentity) -> AuthDecision {
        self(tool_name, caller)
    }
}

/// Lets every call through. Used when no API keys are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthHook for AllowAll {
    fn check(&self, _tool_name: &str, _caller: &CallerIdentity) -> AuthDecision {
        AuthDecision::Proceed
    }
}

/// Static API key check.
pub struct ApiKeyAuth {
    keys: HashSet<String>,
}

impl ApiKeyAuth {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

impl fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("keys", &format_args!("[{} redacted]", self.keys.len()))
            .finish()
    }
}

impl AuthHook for ApiKeyAuth {
    fn check(&self, _tool_name: &str, caller: &CallerIdentity) -> AuthDecision {
        match caller.bearer_token() {
            None => AuthDecision::access_denied("Access denied: API key required"),
            Some(token) if self.keys.contains(token) => AuthDecision::Proceed,
            Some(_) => AuthDecision::authorization_failed("Authorization failed: invalid API key"),
        }
    }
}

/// Proof that the auth hook approved the current call.
///
/// Engines take one by value before touching their DAO.
#[derive(Debug)]
pub struct Authorized {
    _private: (),
}

/// Per-call context handed to a tool.
pub struct CallContext<'a> {
    tool_name: &'a str,
    caller: &'a CallerIdentity,
    hook: &'a dyn AuthHook,
}

impl<'a> CallContext<'a> {
    pub fn new(tool_name: &'a str, caller: &'a CallerIdentity, hook: &'a dyn AuthHook) -> Self {
        Self {
            tool_name,
            caller,
            hook,
        }
    }

    pub fn tool_name(&self) -> &str {
        self.tool_name
    }

    pub fn caller(&self) -> &CallerIdentity {
        self.caller
    }

    /// Run the auth hook. Called once the request has been validated.
    pub fn authorize(&self) -> Result<Authorized, ToolError> {
        debug!(tool = self.tool_name, phase = %CallPhase::Validated, "Request validated");

        match self.hook.check(self.tool_name, self.caller) {
            AuthDecision::Proceed => {
                debug!(tool = self.tool_name, phase = %CallPhase::Authorized, "Call authorized");
                Ok(Authorized { _private: () })
            }
            AuthDecision::Deny { kind, message } => {
                warn!(tool = self.tool_name, ?kind, "Auth hook refused call: {}", message);
                Err(match kind {
                    DenyKind::AccessDenied => ToolError::AccessDenied(message),
                    DenyKind::AuthorizationFailed => ToolError::AuthorizationFailed(message),
                })
            }
        }
    }
}

/// States of a tool call.
///
/// `Received → Validated → Authorized → Executed → Responded`, or
/// `Received → Validated → AuthorizationFailed → Responded`, or any state
/// `→ InternalError → Responded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    Received,
    Validated,
    Authorized,
    Executed,
    AuthorizationFailed,
    InternalError,
    Responded,
}

impl CallPhase {
    /// Last phase reached before the response, given how the call ended.
    pub fn before_response(outcome: &Result<serde_json::Value, ToolError>) -> Self {
        match outcome {
            Ok(_) | Err(ToolError::NotFound(_)) => CallPhase::Executed,
            Err(ToolError::AccessDenied(_)) | Err(ToolError::AuthorizationFailed(_)) => {
                CallPhase::AuthorizationFailed
            }
            Err(ToolError::Internal(_)) => CallPhase::InternalError,
            Err(ToolError::Validation(_)) | Err(ToolError::UnknownTool(_)) => CallPhase::Received,
        }
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallPhase::Received => "received",
            CallPhase::Validated => "validated",
            CallPhase::Authorized => "authorized",
            CallPhase::Executed => "executed",
            CallPhase::AuthorizationFailed => "authorization_failed",
            CallPhase::InternalError => "internal_error",
            CallPhase::Responded => "responded",
        };
        f.write_str(s)
    }
}
