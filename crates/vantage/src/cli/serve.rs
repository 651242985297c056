//! `vantage serve` - MCP server over stdio

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;
use vantage_mcp::protocol::McpTransport;
use vantage_mcp::{McpServer, McpServerConfig};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// JSON catalog of dashboards, charts and datasets
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Key presented on calls that carry no credentials of their own
    #[arg(long, env = "VANTAGE_MCP_CLIENT_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Disable the audit log
    #[arg(long)]
    pub no_audit: bool,
}

pub fn run(args: ServeArgs, mut config: McpServerConfig) -> Result<()> {
    if args.no_audit {
        config.audit_log_path = None;
    }

    let catalog = super::load_catalog(args.catalog.as_deref(), &config)?;
    let mut server = McpServer::from_catalog(config, catalog)?;
    if let Some(key) = args.api_key {
        server = server.with_default_api_key(key);
    }

    info!("MCP server listening on stdio ({} tools registered)", server.tools().len());

    super::runtime()?.block_on(async {
        let mut transport = McpTransport::stdio();
        server.run(&mut transport).await.context("MCP server failed")
    })
}
