//! MCP Transport Layer
//!
//! This module defines the transport abstraction for MCP communication.
//! A server reads and writes concurrently, so a transport is a pair of
//! halves rather than one bidirectional handle.

#[cfg(feature = "stdio")]
pub mod stdio;

use crate::protocol::McpError;
use async_trait::async_trait;

/// Receiving half of a transport
#[async_trait]
pub trait MessageReader: Send {
    /// Receive the next message from the client, or `None` at end of stream.
    ///
    /// A line that cannot be decoded yields an error for which
    /// [`McpError::is_frame_error`] holds; the stream stays usable.
    async fn receive(&mut self) -> Result<Option<String>, McpError>;
}

/// Sending half of a transport
#[async_trait]
pub trait MessageWriter: Send {
    /// Send one message to the client
    async fn send(&mut self, message: &str) -> Result<(), McpError>;

    /// Flush and close the sending side
    async fn close(&mut self) -> Result<(), McpError>;
}
