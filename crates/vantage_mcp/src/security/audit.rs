//! Audit Logging - Tool Invocation Recording
//!
//! Records every MCP request, response and tool call in an append-only
//! NDJSON file. Parameters are summarized by key names only, so filter
//! values and API keys never reach the log.
//!
//! # Log Format
//!
//! ```json
//! {"type":"request","ts":"2026-01-21T10:30:00+00:00","method":"tools/call","id":"1","params_summary":"{keys: [name, arguments]}"}
//! {"type":"tool_call","ts":"2026-01-21T10:30:00+00:00","tool":"list_dashboards","phase":"executed","error_type":null,"duration_ms":3}
//! {"type":"response","ts":"2026-01-21T10:30:00+00:00","id":"1","success":true}
//! ```

use super::SecurityError;
use crate::auth::CallPhase;
use crate::error::ErrorType;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Audit log for recording MCP operations
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl AuditLog {
    /// Open (or create) the audit log in append mode
    pub fn new(path: PathBuf) -> Result<Self, SecurityError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SecurityError::AuditError(format!("Failed to create audit log directory: {}", e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SecurityError::AuditError(format!("Failed to open audit log: {}", e)))?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn log_request(&self, request: &JsonRpcRequest) -> Result<(), SecurityError> {
        self.write_entry(&AuditEntry::Request {
            ts: Utc::now(),
            method: request.method.clone(),
            id: request.id.as_ref().map(id_text),
            params_summary: request.params.as_ref().map(summarize_params),
        })
    }

    pub fn log_response(&self, response: &JsonRpcResponse) -> Result<(), SecurityError> {
        self.write_entry(&AuditEntry::Response {
            ts: Utc::now(),
            id: id_text(&response.id),
            success: response.error.is_none(),
            error_code: response.error.as_ref().map(|e| e.code),
        })
    }

    /// Record the outcome of one tool call
    pub fn log_tool_call(
        &self,
        tool_name: &str,
        phase: CallPhase,
        error_type: Option<ErrorType>,
        duration_ms: u64,
    ) -> Result<(), SecurityError> {
        self.write_entry(&AuditEntry::ToolCall {
            ts: Utc::now(),
            tool: tool_name.to_string(),
            phase,
            error_type,
            duration_ms,
        })
    }

    fn write_entry(&self, entry: &AuditEntry) -> Result<(), SecurityError> {
        let json = serde_json::to_string(entry).map_err(|e| {
            SecurityError::AuditError(format!("Failed to serialize audit entry: {}", e))
        })?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SecurityError::AuditError(format!("Failed to lock audit log: {}", e)))?;

        writeln!(writer, "{}", json)
            .map_err(|e| SecurityError::AuditError(format!("Failed to write audit entry: {}", e)))?;

        writer
            .flush()
            .map_err(|e| SecurityError::AuditError(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Audit log entry types
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AuditEntry {
    Request {
        #[serde(with = "crate::envelope::rfc3339")]
        ts: DateTime<Utc>,
        method: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        params_summary: Option<String>,
    },
    Response {
        #[serde(with = "crate::envelope::rfc3339")]
        ts: DateTime<Utc>,
        id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<i32>,
    },
    ToolCall {
        #[serde(with = "crate::envelope::rfc3339")]
        ts: DateTime<Utc>,
        tool: String,
        phase: CallPhase,
        error_type: Option<ErrorType>,
        duration_ms: u64,
    },
}

fn id_text(id: &RequestId) -> String {
    match id {
        RequestId::String(s) => s.clone(),
        RequestId::Number(n) => n.to_string(),
        RequestId::Null => "null".to_string(),
    }
}

/// Summarize params by shape and key names only
fn summarize_params(params: &Value) -> String {
    match params {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
            format!("{{keys: [{}]}}", keys.join(", "))
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        _ => "[value]".to_string(),
    }
}
