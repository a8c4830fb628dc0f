//! MCP Server Implementation
//!
//! The server owns the protocol session: the initialize handshake, tool
//! listing and dispatch, logging level, and cancellation of in-flight calls.
//! Each `tools/call` runs on its own task; every outgoing frame funnels
//! through a single writer task so concurrent calls never interleave lines.

use crate::protocol::{
    messages::{IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId},
    methods,
    types::{
        negotiate_protocol_version, CancelledParams, Implementation, InitializeParams,
        InitializeResult, LoggingLevel, LoggingMessageParams, McpTool, McpToolResult,
        ProgressParams, ProgressToken, ServerCapabilities, SetLevelParams, ToolCallParams,
        ToolsCapability, ToolsListResult,
    },
    McpError, McpResult,
};
use crate::transport::{MessageReader, MessageWriter};
use async_trait::async_trait;
use recipes_core::CancelHandle;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, trace, warn};

/// Default capacity of the outgoing frame queue
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// MCP Server Configuration
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Server name reported in `serverInfo` and used as the logger name
    pub name: String,

    /// Server version reported in `serverInfo`
    pub version: String,

    /// Optional usage instructions returned from `initialize`
    pub instructions: Option<String>,

    /// Outgoing frames buffered before senders wait
    pub channel_capacity: usize,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            name: "vegan-recipes-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl McpServerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// A tool the server can execute
#[async_trait]
pub trait ServerTool: Send + Sync {
    /// Definition returned from `tools/list`
    fn descriptor(&self) -> McpTool;

    /// Execute the tool. `arguments` is `{}` when the client sent none.
    async fn call(&self, arguments: Value, ctx: ToolCallContext) -> McpResult<McpToolResult>;
}

/// Type alias for shared tool instances
pub type ToolHandle = Arc<dyn ServerTool>;

/// Tools served by name, listed in name order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolHandle>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: ToolHandle) -> &mut Self {
        let name = tool.descriptor().name;
        self.tools.insert(name, tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolHandle> {
        self.tools.get(name)
    }

    pub fn descriptors(&self) -> Vec<McpTool> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Cloneable handle for sending frames to the client
#[derive(Debug, Clone)]
pub struct Peer {
    tx: mpsc::Sender<String>,
}

impl Peer {
    async fn send_frame<T: Serialize>(&self, frame: &T) -> Result<(), McpError> {
        let line = serde_json::to_string(frame)?;
        self.tx.send(line).await.map_err(|_| McpError::Closed)
    }

    /// Send a notification
    pub async fn notify<P: Serialize>(&self, method: &str, params: P) -> Result<(), McpError> {
        let notification = JsonRpcNotification::new(method).with_params(serde_json::to_value(params)?);
        trace!(method = %method, "Sending JSON-RPC notification");
        self.send_frame(&notification).await
    }

    /// Send a response
    pub async fn respond(&self, response: JsonRpcResponse) -> Result<(), McpError> {
        self.send_frame(&response).await
    }
}

/// Minimum level for `notifications/message`, shared across tasks
#[derive(Debug)]
struct SharedLevel(AtomicU8);

impl SharedLevel {
    fn new(level: LoggingLevel) -> Self {
        Self(AtomicU8::new(level.as_u8()))
    }

    fn get(&self) -> LoggingLevel {
        LoggingLevel::from_u8(self.0.load(Ordering::Relaxed)).unwrap_or(LoggingLevel::Debug)
    }

    fn set(&self, level: LoggingLevel) {
        self.0.store(level.as_u8(), Ordering::Relaxed);
    }
}

/// Per-call handle given to a [`ServerTool`]
#[derive(Debug, Clone)]
pub struct ToolCallContext {
    peer: Peer,
    request_id: RequestId,
    progress_token: Option<ProgressToken>,
    cancel: CancelHandle,
    log_level: Arc<SharedLevel>,
    logger: String,
}

impl ToolCallContext {
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn progress_token(&self) -> Option<&ProgressToken> {
        self.progress_token.as_ref()
    }

    /// Fires when the client sends `notifications/cancelled` for this call
    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Send a log message if `level` passes the session's threshold
    pub async fn log(&self, level: LoggingLevel, message: impl Into<String>) -> Result<(), McpError> {
        if level < self.log_level.get() {
            return Ok(());
        }
        let params = LoggingMessageParams {
            level,
            logger: Some(self.logger.clone()),
            data: Value::String(message.into()),
        };
        self.peer.notify(methods::NOTIFY_MESSAGE, params).await
    }

    pub async fn info(&self, message: impl Into<String>) -> Result<(), McpError> {
        self.log(LoggingLevel::Info, message).await
    }

    /// Report progress; a no-op when the client supplied no progress token
    pub async fn report_progress(&self, progress: u64, total: Option<u64>) -> Result<(), McpError> {
        let Some(token) = &self.progress_token else {
            return Ok(());
        };
        let params = ProgressParams {
            progress_token: token.clone(),
            progress,
            total,
            message: None,
        };
        self.peer.notify(methods::NOTIFY_PROGRESS, params).await
    }
}

/// Session state shared with spawned call tasks
#[derive(Debug)]
struct Session {
    initialized: AtomicBool,
    log_level: Arc<SharedLevel>,
    in_flight: Mutex<HashMap<RequestId, CancelHandle>>,
}

impl Session {
    fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            log_level: Arc::new(SharedLevel::new(LoggingLevel::Debug)),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Register a call, refusing an id that is still in flight.
    fn begin_call(&self, id: &RequestId) -> McpResult<CancelHandle> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| McpError::other("in-flight call table is poisoned"))?;
        if in_flight.contains_key(id) {
            return Err(McpError::protocol(format!(
                "request id {} is already in flight",
                id
            )));
        }
        let handle = CancelHandle::new();
        in_flight.insert(id.clone(), handle.clone());
        Ok(handle)
    }

    fn finish_call(&self, id: &RequestId) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(id);
        }
    }

    fn cancel_call(&self, id: &RequestId) -> bool {
        let handle = self
            .in_flight
            .lock()
            .ok()
            .and_then(|in_flight| in_flight.get(id).cloned());
        match handle {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }
}

/// MCP Server
///
/// Serves a [`ToolRegistry`] over a reader/writer transport pair.
pub struct McpServer {
    config: McpServerConfig,
    tools: ToolRegistry,
    session: Arc<Session>,
}

impl McpServer {
    pub fn new(config: McpServerConfig, tools: ToolRegistry) -> Self {
        Self {
            config,
            tools,
            session: Arc::new(Session::new()),
        }
    }

    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Serve until the reader reaches end of stream.
    ///
    /// In-flight tool calls are allowed to finish and their responses are
    /// flushed before this returns.
    #[instrument(skip_all, name = "mcp_serve", fields(server = %self.config.name))]
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), McpError>
    where
        R: MessageReader,
        W: MessageWriter + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<String>(self.config.channel_capacity.max(1));
        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                writer.send(&line).await?;
            }
            writer.close().await
        });

        let peer = Peer { tx };
        let mut calls = JoinSet::new();
        info!(tools = self.tools.len(), "MCP server ready");

        let read_result = loop {
            match reader.receive().await {
                Ok(Some(line)) => {
                    if let Err(e) = self.handle_line(&line, &peer, &mut calls).await {
                        break Err(e);
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) if e.is_frame_error() => {
                    warn!(error = %e, "Received undecodable frame");
                    if let Err(e) = peer
                        .respond(JsonRpcResponse::failure(None, e.to_rpc_error()))
                        .await
                    {
                        break Err(e);
                    }
                }
                Err(e) => break Err(e),
            }
            while let Some(joined) = calls.try_join_next() {
                log_join(joined);
            }
        };

        debug!(pending = calls.len(), "Input closed, draining in-flight calls");
        while let Some(joined) = calls.join_next().await {
            log_join(joined);
        }

        drop(peer);
        let write_result = writer_task
            .await
            .map_err(|e| McpError::other(format!("writer task failed: {}", e)))?;

        read_result?;
        write_result
    }

    async fn handle_line(
        &self,
        line: &str,
        peer: &Peer,
        calls: &mut JoinSet<()>,
    ) -> Result<(), McpError> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Received unparseable JSON-RPC frame");
                return peer
                    .respond(JsonRpcResponse::failure(
                        None,
                        McpError::Parse(e.to_string()).to_rpc_error(),
                    ))
                    .await;
            }
        };

        let message: IncomingMessage = match serde_json::from_value(value.clone()) {
            Ok(message) => message,
            Err(e) => {
                let id = value
                    .get("id")
                    .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
                return peer
                    .respond(JsonRpcResponse::failure(
                        id,
                        McpError::protocol(e.to_string()).to_rpc_error(),
                    ))
                    .await;
            }
        };

        match message {
            IncomingMessage::Request(request) => self.handle_request(request, peer, calls).await,
            IncomingMessage::Notification(notification) => {
                self.handle_notification(notification);
                Ok(())
            }
            IncomingMessage::Response(response) => {
                trace!(id = ?response.id, "Ignoring response from client");
                Ok(())
            }
        }
    }

    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        peer: &Peer,
        calls: &mut JoinSet<()>,
    ) -> Result<(), McpError> {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        debug!(method = %method, id = %id, "Handling JSON-RPC request");

        let gated = !matches!(method.as_str(), methods::INITIALIZE | methods::PING);
        if gated && !self.session.is_initialized() {
            let error = McpError::NotInitialized.to_rpc_error();
            return peer.respond(JsonRpcResponse::failure(Some(id), error)).await;
        }

        let result = match method.as_str() {
            methods::INITIALIZE => self.initialize(params),
            methods::PING => Ok(serde_json::json!({})),
            methods::TOOLS_LIST => to_result(&ToolsListResult {
                tools: self.tools.descriptors(),
                next_cursor: None,
            }),
            methods::LOGGING_SET_LEVEL => self.set_level(params),
            methods::TOOLS_CALL => match self.spawn_call(id.clone(), params, peer, calls) {
                Ok(()) => return Ok(()),
                Err(e) => Err(e),
            },
            other => Err(McpError::Rpc(JsonRpcError::method_not_found(other))),
        };

        let response = match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                debug!(error = %e, "Request failed");
                JsonRpcResponse::failure(Some(id), e.to_rpc_error())
            }
        };
        peer.respond(response).await
    }

    fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            methods::NOTIFY_INITIALIZED => debug!("Client finished initialization"),
            methods::NOTIFY_CANCELLED => {
                match parse_params::<CancelledParams>(notification.params) {
                    Ok(params) => {
                        let found = self.session.cancel_call(&params.request_id);
                        info!(
                            id = %params.request_id,
                            reason = ?params.reason,
                            found,
                            "Client cancelled request"
                        );
                    }
                    Err(e) => warn!(error = %e, "Malformed cancellation notification"),
                }
            }
            other => trace!(method = %other, "Ignoring client notification"),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = parse_params(params)?;
        let protocol_version = negotiate_protocol_version(&params.protocol_version);

        info!(
            client = ?params.client_info.as_ref().map(|c| c.name.as_str()),
            requested = %params.protocol_version,
            protocol_version,
            "MCP client initialized"
        );
        self.session.initialized.store(true, Ordering::SeqCst);

        to_result(&InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                logging: Some(serde_json::json!({})),
            },
            server_info: Implementation {
                name: self.config.name.clone(),
                version: Some(self.config.version.clone()),
            },
            instructions: self.config.instructions.clone(),
        })
    }

    fn set_level(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: SetLevelParams = parse_params(params)?;
        self.session.log_level.set(params.level);
        debug!(level = %params.level, "Client set logging level");
        Ok(serde_json::json!({}))
    }

    fn spawn_call(
        &self,
        id: RequestId,
        params: Option<Value>,
        peer: &Peer,
        calls: &mut JoinSet<()>,
    ) -> Result<(), McpError> {
        let params: ToolCallParams = parse_params(params)?;
        let tool = self
            .tools
            .get(&params.name)
            .cloned()
            .ok_or_else(|| McpError::ToolNotFound(params.name.clone()))?;

        let ctx = ToolCallContext {
            peer: peer.clone(),
            request_id: id.clone(),
            progress_token: params.progress_token(),
            cancel: self.session.begin_call(&id)?,
            log_level: self.session.log_level.clone(),
            logger: self.config.name.clone(),
        };
        let arguments = params
            .arguments
            .unwrap_or_else(|| Value::Object(Default::default()));
        let session = self.session.clone();
        let peer = peer.clone();
        let tool_name = params.name;

        calls.spawn(async move {
            debug!(tool_name = %tool_name, id = %id, "Calling tool");
            let outcome = tool.call(arguments, ctx).await;
            session.finish_call(&id);

            let response = match outcome.and_then(|result| to_result(&result)) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => {
                    warn!(tool_name = %tool_name, error = %e, "Tool call failed");
                    JsonRpcResponse::failure(Some(id), e.to_rpc_error())
                }
            };
            if let Err(e) = peer.respond(response).await {
                warn!(tool_name = %tool_name, error = %e, "Failed to deliver tool result");
            }
        });
        Ok(())
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, McpError> {
    let params = params.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(params).map_err(|e| McpError::invalid_params(e.to_string()))
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(McpError::from)
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "Tool call task panicked or was aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl ServerTool for EchoTool {
        fn descriptor(&self) -> McpTool {
            McpTool {
                name: "echo".to_string(),
                description: Some("Echo args".to_string()),
                input_schema: serde_json::json!({"type": "object"}),
            }
        }

        async fn call(
            &self,
            arguments: Value,
            ctx: ToolCallContext,
        ) -> McpResult<McpToolResult> {
            ctx.info("echoing").await?;
            ctx.report_progress(1, Some(1)).await?;
            Ok(McpToolResult::text(arguments.to_string()))
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = McpServerConfig::default();
        assert_eq!(config.name, "vegan-recipes-mcp");
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.instructions.is_none());
    }

    #[test]
    fn test_registry_lists_in_name_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
        assert_eq!(registry.descriptors()[0].name, "echo");
    }

    #[test]
    fn test_session_cancels_in_flight_call() {
        let session = Session::new();
        let id = RequestId::Number(3);
        let handle = session.begin_call(&id).unwrap();

        assert!(session.cancel_call(&id));
        assert!(handle.is_cancelled());

        session.finish_call(&id);
        assert!(!session.cancel_call(&id));
    }

    #[test]
    fn test_session_rejects_reused_in_flight_id() {
        let session = Session::new();
        let id = RequestId::String("batch-1".into());
        let first = session.begin_call(&id).unwrap();

        let err = session.begin_call(&id).unwrap_err();
        assert!(matches!(err, McpError::Protocol(_)));
        assert_eq!(err.to_rpc_error().code, -32600);

        // The first call still owns the slot
        assert!(session.cancel_call(&id));
        assert!(first.is_cancelled());

        session.finish_call(&id);
        assert!(session.begin_call(&id).is_ok());
    }

    #[tokio::test]
    async fn test_context_filters_by_level_and_token() {
        let (tx, mut rx) = mpsc::channel(8);
        let level = Arc::new(SharedLevel::new(LoggingLevel::Warning));
        let ctx = ToolCallContext {
            peer: Peer { tx },
            request_id: RequestId::Number(1),
            progress_token: None,
            cancel: CancelHandle::new(),
            log_level: level.clone(),
            logger: "test".into(),
        };

        ctx.info("dropped").await.unwrap();
        ctx.report_progress(1, Some(2)).await.unwrap();
        assert!(rx.try_recv().is_err());

        level.set(LoggingLevel::Info);
        ctx.info("kept").await.unwrap();
        let frame: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["method"], "notifications/message");
        assert_eq!(frame["params"]["level"], "info");
        assert_eq!(frame["params"]["logger"], "test");
        assert_eq!(frame["params"]["data"], "kept");
    }

    #[tokio::test]
    async fn test_peer_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let peer = Peer { tx };
        let err = peer
            .notify(methods::NOTIFY_MESSAGE, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_closed());
    }
}
