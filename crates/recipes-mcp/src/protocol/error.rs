//! MCP Error Types
//!
//! This module defines error types for MCP server operations.

use crate::protocol::messages::{error_codes, JsonRpcError};
use thiserror::Error;

/// MCP Server Error
///
/// Represents all possible errors that can occur while serving MCP requests.
#[derive(Debug, Error)]
pub enum McpError {
    /// JSON-RPC error to relay to the client as-is
    #[error("JSON-RPC error: {0}")]
    Rpc(#[from] JsonRpcError),

    /// Transport-level error (I/O, connection, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An incoming line could not be decoded as JSON text
    #[error("Parse error: {0}")]
    Parse(String),

    /// Well-formed JSON that is not a valid request (bad shape, reused id)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Request parameters failed validation
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Session has not completed the initialize handshake
    #[error("Server not initialized - send initialize first")]
    NotInitialized,

    /// Tool not found
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Outgoing channel to the client is gone
    #[error("Connection to MCP client closed")]
    Closed,

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

impl McpError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        McpError::Transport(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        McpError::Protocol(msg.into())
    }

    /// Create an invalid params error
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        McpError::InvalidParams(msg.into())
    }

    /// Create an "other" error
    pub fn other(msg: impl Into<String>) -> Self {
        McpError::Other(msg.into())
    }

    /// Check if the client connection is gone
    pub fn is_closed(&self) -> bool {
        matches!(self, McpError::Closed)
    }

    /// A bad incoming frame: answered with an error, the session goes on
    pub fn is_frame_error(&self) -> bool {
        matches!(self, McpError::Parse(_))
    }

    /// JSON-RPC error object sent back for this failure
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            McpError::Rpc(err) => err.clone(),
            McpError::Parse(detail) => JsonRpcError::parse_error(detail),
            McpError::Protocol(detail) => JsonRpcError::invalid_request(detail),
            McpError::Json(_) | McpError::InvalidParams(_) | McpError::ToolNotFound(_) => {
                JsonRpcError::new(error_codes::INVALID_PARAMS, self.to_string())
            }
            McpError::NotInitialized => {
                JsonRpcError::new(error_codes::INVALID_REQUEST, self.to_string())
            }
            _ => JsonRpcError::new(error_codes::INTERNAL_ERROR, self.to_string()),
        }
    }
}

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = McpError::ToolNotFound("read_file".to_string());
        assert_eq!(err.to_string(), "Unknown tool: read_file");
    }

    #[test]
    fn test_frame_errors_are_recoverable() {
        assert!(McpError::Parse("invalid UTF-8".into()).is_frame_error());
        assert!(!McpError::transport("connection reset").is_frame_error());
        assert!(McpError::Closed.is_closed());
        assert!(!McpError::other("x").is_closed());
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(
            McpError::Parse("eof".into()).to_rpc_error().code,
            error_codes::PARSE_ERROR
        );
        let reused = McpError::protocol("request id 4 is already in flight").to_rpc_error();
        assert_eq!(reused.code, error_codes::INVALID_REQUEST);
        assert!(reused.message.contains("already in flight"));
        assert_eq!(
            McpError::ToolNotFound("x".into()).to_rpc_error().code,
            error_codes::INVALID_PARAMS
        );
        assert_eq!(
            McpError::NotInitialized.to_rpc_error().code,
            error_codes::INVALID_REQUEST
        );
        assert_eq!(
            McpError::Closed.to_rpc_error().code,
            error_codes::INTERNAL_ERROR
        );
        let relayed = JsonRpcError::method_not_found("foo/bar");
        assert_eq!(
            McpError::Rpc(relayed).to_rpc_error().code,
            error_codes::METHOD_NOT_FOUND
        );
    }
}
