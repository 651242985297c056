//! CLI commands
//!
//! Each subcommand lives in its own module with an `Args` struct and a
//! `run` entry point.

pub mod call;
pub mod config;
pub mod serve;
pub mod tools;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;
use vantage_mcp::{Catalog, McpServerConfig};

/// Load the catalog named on the command line, else the configured one.
/// With neither, the server runs over an empty catalog.
pub fn load_catalog(flag: Option<&Path>, config: &McpServerConfig) -> Result<Catalog> {
    match flag.or(config.catalog_path.as_deref()) {
        Some(path) => Catalog::load(path),
        None => {
            warn!("No catalog configured; serving an empty catalog");
            Ok(Catalog::default())
        }
    }
}

/// Single-threaded runtime for one command.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}
