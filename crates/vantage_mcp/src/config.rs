//! Configuration for the MCP server
//!
//! Loaded from a TOML file; every field has a default so an empty file
//! (or no file at all) yields a working server.
//!
//! ```toml
//! server_name = "vantage-mcp"
//! max_response_bytes = 1048576
//! default_page_size = 100
//! max_page_size = 1000
//! catalog_path = "/srv/vantage/catalog.json"
//!
//! [auth]
//! api_keys = ["k-1"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::auth::{AllowAll, ApiKeyAuth, AuthHook};
use crate::security::OutputBudget;
use crate::tools::ListLimits;

/// Extra API key appended to `auth.api_keys`
pub const API_KEY_ENV: &str = "VANTAGE_MCP_API_KEY";

/// Overrides the home directory
pub const HOME_ENV: &str = "VANTAGE_HOME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// MCP Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerConfig {
    /// Server name (reported in initialize)
    pub server_name: String,

    /// Server version (reported in initialize)
    pub server_version: String,

    /// Maximum serialized tool result in bytes
    pub max_response_bytes: usize,

    /// Page size used when a list call names none
    pub default_page_size: u32,

    /// Larger requested page sizes are clamped to this
    pub max_page_size: u32,

    /// NDJSON audit log; `None` disables auditing
    pub audit_log_path: Option<PathBuf>,

    /// JSON catalog of dashboards, charts and datasets
    pub catalog_path: Option<PathBuf>,

    pub auth: AuthConfig,
}

/// Authentication settings. No keys means every caller is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub api_keys: Vec<String>,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            server_name: "vantage-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            max_response_bytes: 1024 * 1024, // 1MB
            default_page_size: ListLimits::default().default_page_size,
            max_page_size: ListLimits::default().max_page_size,
            audit_log_path: Some(vantage_home().join("mcp_audit.ndjson")),
            catalog_path: None,
            auth: AuthConfig::default(),
        }
    }
}

impl McpServerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: McpServerConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("Loaded config from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the default config file if it
    /// exists, otherwise defaults. The API key environment variable is
    /// applied last.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Read {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            let key = key.trim();
            if !key.is_empty() && !self.auth.api_keys.iter().any(|k| k == key) {
                self.auth.api_keys.push(key.to_string());
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be at least 1".into()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size must be between 1 and max_page_size ({})",
                self.max_page_size
            )));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid("max_response_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn list_limits(&self) -> ListLimits {
        ListLimits {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }

    pub fn output_budget(&self) -> OutputBudget {
        OutputBudget::new(self.max_response_bytes)
    }

    /// API-key auth when keys are configured, otherwise allow all callers
    pub fn auth_hook(&self) -> Arc<dyn AuthHook> {
        if self.auth.api_keys.is_empty() {
            Arc::new(AllowAll)
        } else {
            Arc::new(ApiKeyAuth::new(self.auth.api_keys.iter().cloned()))
        }
    }
}

/// Get the Vantage home directory: `$VANTAGE_HOME` or ~/.vantage
pub fn vantage_home() -> PathBuf {
    if let Ok(override_path) = std::env::var(HOME_ENV) {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vantage")
}

/// ~/.vantage/config.toml
pub fn default_config_path() -> PathBuf {
    vantage_home().join("config.toml")
}
