//! Vegan Recipes MCP Server
//!
//! Serves the `run_vegan_recipes_api_on_csv` tool over stdio. Point an MCP
//! client at this binary:
//!
//! ```bash
//! vegan-recipes-mcp --row-delay-ms 1000 --log-level info
//! ```
//!
//! Diagnostics go to stderr; stdout carries only protocol frames.

use clap::Parser;
use recipes_core::{BatchConfig, BatchDriver, ParameterSet, DEFAULT_CALL_NAME};
use recipes_mcp::{stdio, McpServer, McpServerConfig, RecipesBatchTool, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const INSTRUCTIONS: &str = "Call run_vegan_recipes_api_on_csv with an absolute csv_path. \
Pass a progressToken in _meta to receive per-row progress.";

#[derive(Debug, Parser)]
#[command(name = "vegan-recipes-mcp")]
#[command(about = "MCP server that turns CSV rows into recipes.search calls")]
#[command(version)]
struct Cli {
    /// Pause between rows, in milliseconds
    #[arg(long, default_value_t = 1000)]
    row_delay_ms: u64,

    /// Call name rendered for each row
    #[arg(long, default_value = DEFAULT_CALL_NAME)]
    call_name: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Server name reported to the client
    #[arg(long, default_value = "vegan-recipes-mcp")]
    name: String,
}

impl Cli {
    fn batch_config(&self) -> BatchConfig {
        BatchConfig::new()
            .with_row_delay(Duration::from_millis(self.row_delay_ms))
            .with_call_name(self.call_name.clone())
    }

    fn server_config(&self) -> McpServerConfig {
        McpServerConfig::default()
            .with_name(self.name.clone())
            .with_instructions(INSTRUCTIONS)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let driver = BatchDriver::new(Arc::new(ParameterSet::recipes()), cli.batch_config());
    let mut tools = ToolRegistry::new();
    tools.register(RecipesBatchTool::new(driver).into_handle());

    let server = McpServer::new(cli.server_config(), tools);
    info!(
        name = %cli.name,
        row_delay_ms = cli.row_delay_ms,
        call_name = %cli.call_name,
        "Starting MCP server on stdio"
    );

    let (reader, writer) = stdio();
    server.serve(reader, writer).await?;

    info!("MCP client disconnected, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["vegan-recipes-mcp"]).unwrap();
        assert_eq!(cli.row_delay_ms, 1000);
        assert_eq!(cli.call_name, "recipes.search");
        assert_eq!(cli.batch_config().row_delay, Duration::from_secs(1));
        assert_eq!(cli.server_config().name, "vegan-recipes-mcp");
        assert!(cli.server_config().instructions.is_some());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "vegan-recipes-mcp",
            "--row-delay-ms",
            "0",
            "--call-name",
            "recipes.lookup",
            "--name",
            "demo",
        ])
        .unwrap();
        let config = cli.batch_config();
        assert!(config.row_delay.is_zero());
        assert_eq!(config.call_name, "recipes.lookup");
        assert_eq!(cli.server_config().name, "demo");
    }
}
