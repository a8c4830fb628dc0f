//! # recipes-mcp
//!
//! Model Context Protocol (MCP) server for the vegan recipes CSV runner.
//!
//! This crate serves a small registry of tools over newline-delimited
//! JSON-RPC 2.0. It is built directly on serde and tokio without an external
//! MCP dependency.
//!
//! ## Features
//!
//! - **JSON-RPC 2.0**: Requests, notifications and error codes
//! - **Stdio Transport**: Serve over the process's stdin/stdout
//! - **Progress and Logging**: `notifications/progress` and `notifications/message`
//! - **Cancellation**: `notifications/cancelled` stops an in-flight batch
//!
//! ## Example
//!
//! ```rust,ignore
//! use recipes_core::BatchDriver;
//! use recipes_mcp::{stdio, McpServer, McpServerConfig, RecipesBatchTool, ToolRegistry};
//!
//! let mut tools = ToolRegistry::new();
//! tools.register(RecipesBatchTool::new(BatchDriver::default()).into_handle());
//!
//! let server = McpServer::new(McpServerConfig::default(), tools);
//! let (reader, writer) = stdio();
//! server.serve(reader, writer).await?;
//! ```

pub mod protocol;
pub mod transport;

mod server;
mod tool_adapter;

// Re-exports
pub use protocol::{
    error::{McpError, McpResult},
    types::{LoggingLevel, McpContent, McpTool, McpToolResult, ProgressToken},
};
pub use server::{McpServer, McpServerConfig, Peer, ServerTool, ToolCallContext, ToolHandle, ToolRegistry};
pub use tool_adapter::{RecipesBatchTool, TOOL_NAME};

#[cfg(feature = "stdio")]
pub use transport::stdio::{stdio, LineReader, LineWriter};
