//! `vantage tools` - list registered tools

use anyhow::Result;
use clap::Args;
use vantage_mcp::protocol::ToolDefinition;
use vantage_mcp::{create_default_registry, Catalog, McpServerConfig, ResourceDaos};

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Print full definitions, including input schemas, as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ToolsArgs, config: McpServerConfig) -> Result<()> {
    let registry = create_default_registry(
        ResourceDaos::from_catalog(&Catalog::default()),
        config.auth_hook(),
        config.list_limits(),
    );
    let tools = registry.list_tools();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
    } else {
        print!("{}", render_table(&tools));
    }
    Ok(())
}

fn render_table(tools: &[ToolDefinition]) -> String {
    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    tools
        .iter()
        .map(|t| format!("{:<width$}  {}\n", t.name, t.description, width = width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_table_aligns_descriptions() {
        let tools = vec![
            ToolDefinition {
                name: "ping".into(),
                description: "a".into(),
                input_schema: json!({}),
            },
            ToolDefinition {
                name: "list_charts".into(),
                description: "b".into(),
                input_schema: json!({}),
            },
        ];

        let table = render_table(&tools);
        assert_eq!(table, "ping         a\nlist_charts  b\n");
    }
}
