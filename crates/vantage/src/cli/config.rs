//! `vantage config` - show the resolved configuration

use anyhow::Result;
use clap::Args;
use vantage_mcp::config::default_config_path;
use vantage_mcp::McpServerConfig;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print as JSON instead of TOML
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ConfigArgs, config: McpServerConfig) -> Result<()> {
    let shown = redacted(config);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        println!("# default file: {}", default_config_path().display());
        print!("{}", toml::to_string_pretty(&shown)?);
    }
    Ok(())
}

/// Replace API keys with a fixed mask.
fn redacted(mut config: McpServerConfig) -> McpServerConfig {
    for key in config.auth.api_keys.iter_mut() {
        *key = "********".to_string();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_masked() {
        let mut config = McpServerConfig::default();
        config.auth.api_keys = vec!["s3cret".into(), "other".into()];

        let shown = redacted(config);
        assert_eq!(shown.auth.api_keys, vec!["********", "********"]);
        assert!(!toml::to_string(&shown).unwrap().contains("s3cret"));
    }
}
