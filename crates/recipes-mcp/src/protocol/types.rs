//! MCP Protocol Types
//!
//! This module defines the MCP-specific types used in the protocol:
//! - Initialization handshake and capabilities
//! - Tool definitions and call results
//! - Progress, logging, and cancellation notifications

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::protocol::messages::RequestId;

// ============================================
// MCP Protocol Version
// ============================================

/// Latest MCP protocol version we support
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Every protocol version this server can speak, oldest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Pick the version to answer `initialize` with.
///
/// The client's requested version wins when supported, otherwise the latest.
pub fn negotiate_protocol_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(MCP_PROTOCOL_VERSION)
}

// ============================================
// Method names
// ============================================

pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const LOGGING_SET_LEVEL: &str = "logging/setLevel";
    pub const NOTIFY_INITIALIZED: &str = "notifications/initialized";
    pub const NOTIFY_CANCELLED: &str = "notifications/cancelled";
    pub const NOTIFY_PROGRESS: &str = "notifications/progress";
    pub const NOTIFY_MESSAGE: &str = "notifications/message";
}

// ============================================
// Initialization Types
// ============================================

/// Parameters for the initialize request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    /// Protocol version the client supports
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,

    /// Client capabilities
    #[serde(default)]
    pub capabilities: Value,

    /// Client information
    #[serde(rename = "clientInfo", default)]
    pub client_info: Option<Implementation>,
}

/// Name and version of an MCP peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,
}

/// Result of the initialize request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    /// Protocol version the server will speak
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,

    /// Server capabilities
    pub capabilities: ServerCapabilities,

    /// Server information
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,

    /// Optional instructions for the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Server capabilities advertised during initialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tools capability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,

    /// Logging capability (an empty object when supported)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<Value>,
}

/// Tools capability details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    /// Whether the server emits tool list changes
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

// ============================================
// Tool Types
// ============================================

/// MCP Tool Definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpTool {
    /// Unique tool name
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of listing tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    /// List of available tools
    pub tools: Vec<McpTool>,

    /// Cursor for pagination (optional)
    #[serde(rename = "nextCursor", default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Progress token supplied by the client in `_meta`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

/// Request metadata carried under `_meta`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMeta {
    #[serde(rename = "progressToken", default, skip_serializing_if = "Option::is_none")]
    pub progress_token: Option<ProgressToken>,
}

/// Parameters for calling a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call
    pub name: String,

    /// Arguments to pass to the tool
    #[serde(default)]
    pub arguments: Option<Value>,

    /// Request metadata
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

impl ToolCallParams {
    pub fn progress_token(&self) -> Option<ProgressToken> {
        self.meta.as_ref().and_then(|m| m.progress_token.clone())
    }
}

/// Result of calling a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    /// Content returned by the tool
    pub content: Vec<McpContent>,

    /// Machine-readable copy of the result
    #[serde(rename = "structuredContent", default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,

    /// Whether this result represents an error
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl McpToolResult {
    /// Plain text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::text(content)],
            structured_content: None,
            is_error: false,
        }
    }

    /// Text result flagged as a tool error
    pub fn error_text(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(content)
        }
    }

    /// Structured result, mirrored as JSON text for older clients
    pub fn structured(value: Value) -> Result<Self, serde_json::Error> {
        let text = serde_json::to_string(&value)?;
        Ok(Self {
            content: vec![McpContent::text(text)],
            structured_content: Some(value),
            is_error: false,
        })
    }
}

// ============================================
// Content Types
// ============================================

/// MCP Content - the server only ever returns text
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum McpContent {
    /// Text content
    #[serde(rename = "text")]
    Text {
        /// The text content
        text: String,
    },
}

impl McpContent {
    /// Create text content
    pub fn text(content: impl Into<String>) -> Self {
        McpContent::Text {
            text: content.into(),
        }
    }

    /// Get text content if this is a text type
    pub fn as_text(&self) -> Option<&str> {
        match self {
            McpContent::Text { text } => Some(text),
        }
    }
}

// ============================================
// Notification Types
// ============================================

/// Parameters of `notifications/progress`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressParams {
    #[serde(rename = "progressToken")]
    pub progress_token: ProgressToken,

    pub progress: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Syslog severities used by MCP logging, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LoggingLevel {
    pub const ALL: [LoggingLevel; 8] = [
        LoggingLevel::Debug,
        LoggingLevel::Info,
        LoggingLevel::Notice,
        LoggingLevel::Warning,
        LoggingLevel::Error,
        LoggingLevel::Critical,
        LoggingLevel::Alert,
        LoggingLevel::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoggingLevel::Debug => "debug",
            LoggingLevel::Info => "info",
            LoggingLevel::Notice => "notice",
            LoggingLevel::Warning => "warning",
            LoggingLevel::Error => "error",
            LoggingLevel::Critical => "critical",
            LoggingLevel::Alert => "alert",
            LoggingLevel::Emergency => "emergency",
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggingLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("unknown logging level '{}'", s))
    }
}

/// Parameters of `notifications/message`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingMessageParams {
    pub level: LoggingLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,

    pub data: Value,
}

/// Parameters of `logging/setLevel`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLevelParams {
    pub level: LoggingLevel,
}

/// Parameters of `notifications/cancelled`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledParams {
    #[serde(rename = "requestId")]
    pub request_id: RequestId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_protocol_version() {
        assert_eq!(negotiate_protocol_version("2024-11-05"), "2024-11-05");
        assert_eq!(negotiate_protocol_version("1999-01-01"), MCP_PROTOCOL_VERSION);
    }

    #[test]
    fn test_tool_call_params_with_progress_token() {
        let json = r#"{
            "name": "run_vegan_recipes_api_on_csv",
            "arguments": {"csv_path": "/tmp/q.csv"},
            "_meta": {"progressToken": "tok-1"}
        }"#;
        let params: ToolCallParams = serde_json::from_str(json).unwrap();
        assert_eq!(
            params.progress_token(),
            Some(ProgressToken::String("tok-1".into()))
        );

        let bare: ToolCallParams = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert!(bare.progress_token().is_none());
        assert!(bare.arguments.is_none());
    }

    #[test]
    fn test_tool_result_serialization() {
        let result = McpToolResult::structured(serde_json::json!({"ok": true})).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["isError"], false);
        assert_eq!(value["structuredContent"]["ok"], true);
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "{\"ok\":true}");

        let err = McpToolResult::error_text("bad args");
        assert!(err.is_error);
        assert_eq!(err.content[0].as_text(), Some("bad args"));
    }

    #[test]
    fn test_logging_level_ordering_and_parsing() {
        assert!(LoggingLevel::Debug < LoggingLevel::Info);
        assert!(LoggingLevel::Warning < LoggingLevel::Emergency);
        assert_eq!("notice".parse::<LoggingLevel>(), Ok(LoggingLevel::Notice));
        assert!("verbose".parse::<LoggingLevel>().is_err());
        for level in LoggingLevel::ALL {
            assert_eq!(LoggingLevel::from_u8(level.as_u8()), Some(level));
        }
    }

    #[test]
    fn test_progress_params_serialization() {
        let params = ProgressParams {
            progress_token: ProgressToken::Number(7),
            progress: 2,
            total: Some(5),
            message: None,
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"progressToken": 7, "progress": 2, "total": 5})
        );
    }

    #[test]
    fn test_initialize_result_serialization() {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                logging: Some(serde_json::json!({})),
            },
            server_info: Implementation {
                name: "vegan-recipes-mcp".into(),
                version: Some("0.1.0".into()),
            },
            instructions: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(value["capabilities"]["logging"], serde_json::json!({}));
        assert_eq!(value["serverInfo"]["name"], "vegan-recipes-mcp");
        assert!(value.get("instructions").is_none());
    }
}
