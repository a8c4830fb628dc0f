//! Stdio Transport for MCP
//!
//! Newline-delimited JSON over the process's stdin/stdout, or over any pair
//! of async byte streams (handy for tests with `tokio::io::duplex`).

use crate::protocol::McpError;
use crate::transport::{MessageReader, MessageWriter};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::{debug, error, trace};

/// Line-oriented reader over an async byte stream
pub struct LineReader<R> {
    reader: BufReader<R>,
    connected: bool,
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            connected: true,
        }
    }

    /// Whether end of stream has not been reached yet
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Line-oriented writer over an async byte stream
pub struct LineWriter<W> {
    writer: W,
    closed: bool,
}

impl<W: AsyncWrite + Unpin + Send> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
        }
    }
}

/// Reader/writer pair bound to this process's stdin and stdout
pub fn stdio() -> (LineReader<Stdin>, LineWriter<Stdout>) {
    debug!("Binding MCP transport to stdio");
    (
        LineReader::new(tokio::io::stdin()),
        LineWriter::new(tokio::io::stdout()),
    )
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> MessageReader for LineReader<R> {
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        loop {
            if !self.connected {
                return Ok(None);
            }

            let mut buf = Vec::new();
            let bytes_read = self.reader.read_until(b'\n', &mut buf).await.map_err(|e| {
                error!(error = %e, "Failed to read from MCP client");
                McpError::transport(format!("Read failed: {}", e))
            })?;

            if bytes_read == 0 {
                debug!("MCP client closed its input stream");
                self.connected = false;
                return Ok(None);
            }

            // The line is consumed even when it is not UTF-8
            let line = String::from_utf8(buf).map_err(|e| {
                debug!(error = %e, "Received a line that is not UTF-8");
                McpError::Parse(format!("invalid UTF-8: {}", e.utf8_error()))
            })?;

            // Remove trailing newline; blank keep-alive lines are skipped
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            trace!(message = %line, "Received message from MCP client");
            return Ok(Some(line.to_string()));
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> MessageWriter for LineWriter<W> {
    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        if self.closed {
            return Err(McpError::Closed);
        }

        trace!(message = %message, "Sending message to MCP client");

        // Write message followed by newline
        self.writer
            .write_all(message.as_bytes())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to write to MCP client");
                McpError::transport(format!("Write failed: {}", e))
            })?;

        self.writer
            .write_all(b"\n")
            .await
            .map_err(|e| McpError::transport(format!("Write newline failed: {}", e)))?;

        self.writer
            .flush()
            .await
            .map_err(|e| McpError::transport(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    async fn close(&mut self) -> Result<(), McpError> {
        if !self.closed {
            self.closed = true;
            self.writer
                .shutdown()
                .await
                .map_err(|e| McpError::transport(format!("Shutdown failed: {}", e)))?;
        }
        Ok(())
    }
}
