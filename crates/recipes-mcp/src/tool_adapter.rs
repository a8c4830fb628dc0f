//! Recipes Batch Tool Adapter
//!
//! Exposes [`BatchDriver`] as the `run_vegan_recipes_api_on_csv` MCP tool.
//! Batch info events become `notifications/message` at info level and batch
//! progress becomes `notifications/progress` on the caller's token.

use crate::protocol::{McpResult, McpTool, McpToolResult};
use crate::server::{ServerTool, ToolCallContext, ToolHandle};
use anyhow::Context as _;
use async_trait::async_trait;
use recipes_core::{BatchDriver, BatchObserver, BatchReport};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Name the batch tool is registered under
pub const TOOL_NAME: &str = "run_vegan_recipes_api_on_csv";

const TOOL_DESCRIPTION: &str = "Run a CSV through the Vegan Recipes API with progress updates. \
Headers are matched case-insensitively against the recipes.search parameters \
(cuisine, dietary_restrictions, include_ingredients, exclude_ingredients, \
max_prep_time_mins, limit, sort_by, city, country); other columns are ignored. One request is rendered per row, \
with a pause between rows. csv_path MUST be an absolute path \
(e.g. '/Users/you/vegan_queries.csv'); relative paths are rejected.";

#[derive(Debug, Deserialize)]
struct BatchToolArgs {
    csv_path: String,
}

/// MCP tool wrapping a [`BatchDriver`]
#[derive(Debug, Clone)]
pub struct RecipesBatchTool {
    driver: BatchDriver,
}

impl RecipesBatchTool {
    pub fn new(driver: BatchDriver) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &BatchDriver {
        &self.driver
    }

    /// Convert this tool into a shared handle for a [`ToolRegistry`](crate::ToolRegistry)
    pub fn into_handle(self) -> ToolHandle {
        Arc::new(self)
    }
}

#[async_trait]
impl ServerTool for RecipesBatchTool {
    fn descriptor(&self) -> McpTool {
        McpTool {
            name: TOOL_NAME.to_string(),
            description: Some(TOOL_DESCRIPTION.to_string()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "csv_path": {
                        "type": "string",
                        "description": "Absolute path to the CSV file of queries"
                    }
                },
                "required": ["csv_path"]
            }),
        }
    }

    #[instrument(skip(self, arguments, ctx), fields(tool_name = TOOL_NAME, id = %ctx.request_id()))]
    async fn call(&self, arguments: Value, ctx: ToolCallContext) -> McpResult<McpToolResult> {
        let args: BatchToolArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => {
                debug!(error = %e, "Rejecting malformed tool arguments");
                return Ok(McpToolResult::error_text(format!("Invalid arguments: {}", e)));
            }
        };

        let observer = McpBatchObserver { ctx: &ctx };
        let result = self
            .driver
            .run(&args.csv_path, &observer, ctx.cancel_handle())
            .await;
        let report = BatchReport::from(result);
        debug!(ok = report.ok, "Batch finished");

        Ok(McpToolResult::structured(serde_json::to_value(&report)?)?)
    }
}

/// Forwards batch events to the MCP client of one tool call
struct McpBatchObserver<'a> {
    ctx: &'a ToolCallContext,
}

#[async_trait]
impl<'a> BatchObserver for McpBatchObserver<'a> {
    async fn on_info(&self, message: &str) -> anyhow::Result<()> {
        self.ctx
            .info(message)
            .await
            .context("sending log notification")
    }

    async fn on_progress(&self, current: u64, total: u64) -> anyhow::Result<()> {
        self.ctx
            .report_progress(current, Some(total))
            .await
            .context("sending progress notification")
    }
}
