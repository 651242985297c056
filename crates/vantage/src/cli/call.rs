//! `vantage call` - dispatch one tool call through the registry

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;
use vantage_mcp::{create_default_registry, CallerIdentity, McpServerConfig, ResourceDaos};

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name, e.g. list_dashboards
    pub tool: String,

    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,

    /// JSON catalog of dashboards, charts and datasets
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// API key presented to the auth hook
    #[arg(long, env = "VANTAGE_MCP_CLIENT_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

pub fn run(args: CallArgs, config: McpServerConfig) -> Result<()> {
    let arguments = parse_arguments(&args.args)?;
    let catalog = super::load_catalog(args.catalog.as_deref(), &config)?;
    let registry = create_default_registry(
        ResourceDaos::from_catalog(&catalog),
        config.auth_hook(),
        config.list_limits(),
    );

    let caller = match args.api_key {
        Some(key) => CallerIdentity::anonymous().with_api_key(key),
        None => CallerIdentity::anonymous(),
    };

    let response = super::runtime()?
        .block_on(registry.call_tool(&args.tool, arguments, &caller))
        .with_context(|| format!("Cannot call {}", args.tool))?;

    let payload = response.payload()?;
    let rendered = if args.compact {
        serde_json::to_string(&payload)?
    } else {
        serde_json::to_string_pretty(&payload)?
    };
    println!("{}", rendered);

    if let Err(envelope) = &response.result {
        bail!("{} returned {}", args.tool, envelope.error_type);
    }
    Ok(())
}

fn parse_arguments(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--args is not valid JSON")?;
    if !value.is_object() {
        bail!("--args must be a JSON object");
    }
    Ok(value)
}
