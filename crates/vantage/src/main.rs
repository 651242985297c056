//! Vantage launcher
//!
//! Runs the MCP server over stdio and offers a few standalone utilities
//! for inspecting and exercising the registered tools.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use vantage_logging::{init_logging, LogConfig};
use vantage_mcp::McpServerConfig;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "vantage", version, about = "MCP tool server for dashboards, charts and datasets")]
struct Cli {
    /// Enable verbose logging (mirrored to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.vantage/config.toml)
    #[arg(long, global = true, env = "VANTAGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server over stdio
    Serve(cli::serve::ServeArgs),

    /// List registered tools
    Tools(cli::tools::ToolsArgs),

    /// Dispatch one tool call and print the result
    Call(cli::call::CallArgs),

    /// Show the resolved configuration
    Config(cli::config::ConfigArgs),
}

fn run_command(command: Commands, config: McpServerConfig) -> Result<()> {
    match command {
        Commands::Serve(args) => cli::serve::run(args, config),
        Commands::Tools(args) => cli::tools::run(args, config),
        Commands::Call(args) => cli::call::run(args, config),
        Commands::Config(args) => cli::config::run(args, config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig::new("vantage").verbose(cli.verbose)) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    let result = McpServerConfig::resolve(cli.config.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|config| run_command(cli.command, config));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}
