//! The MCP client: one session per external server (spec §4.4).

use std::sync::Arc;
use std::time::{Duration, Instant};

use aperture_core::{ServerId, Timestamp};
use aperture_events::{ApertureEvent, EventBus};
use aperture_rpc::{Message, Notification, Request, Response, RpcIdGenerator};
use aperture_transport::Transport;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{McpError, McpResult};
use crate::pending::PendingRequestTable;
use crate::session::SessionState;
use crate::types::{ClientCapabilities, InitializeOutcome, PromptDescriptor, ResourceDescriptor, ToolDescriptor};

/// One MCP client session over an already-open [`Transport`].
///
/// Owns the [`PendingRequestTable`] and the background dispatch loop that
/// demultiplexes responses off the wire (spec §5 "within a single MCP Client
/// the message-dispatch loop is single-threaded"). Cloning an `McpClient`
/// shares the same session; the dispatch loop and pending table are held
/// behind `Arc`.
#[derive(Clone)]
pub struct McpClient {
    server_id: ServerId,
    transport: Arc<dyn Transport>,
    pending: Arc<PendingRequestTable>,
    idgen: Arc<RpcIdGenerator>,
    state: Arc<Mutex<SessionState>>,
    events: Option<EventBus>,
    dispatch: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl McpClient {
    /// Wrap an already-open transport for `server_id`. The session starts
    /// `disconnected`; call [`McpClient::start`] to begin dispatching and
    /// [`McpClient::initialize`] to complete the handshake.
    #[must_use]
    pub fn new(server_id: ServerId, transport: Arc<dyn Transport>) -> Self {
        Self {
            server_id,
            transport,
            pending: Arc::new(PendingRequestTable::new()),
            idgen: Arc::new(RpcIdGenerator::new()),
            state: Arc::new(Mutex::new(SessionState::Disconnected)),
            events: None,
            dispatch: Arc::new(Mutex::new(None)),
        }
    }

    /// Attach an event bus; state transitions publish [`ApertureEvent::ServerProcessStateChanged`].
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// The server this session talks to.
    #[must_use]
    pub fn server_id(&self) -> ServerId {
        self.server_id
    }

    /// The session's current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Number of requests currently awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Start the background dispatch loop and transition `disconnected → connecting`.
    ///
    /// Idempotent: calling twice leaves the first loop running and the
    /// second call is a no-op.
    pub fn start(&self) {
        let mut dispatch = self.dispatch.lock();
        if dispatch.is_some() {
            return;
        }
        self.transition(SessionState::Connecting);
        let client = self.clone();
        *dispatch = Some(tokio::spawn(async move { client.dispatch_loop().await }));
    }

    /// Complete the `initialize` → `tools/list` handshake (spec §4.4).
    ///
    /// # Errors
    /// Returns [`McpError::WrongState`] if the session is not `connecting`,
    /// or whatever [`McpClient::call`] raises if the handshake itself fails
    /// or times out; either way the session is left `closed`.
    pub async fn initialize(
        &self,
        capabilities: &ClientCapabilities,
        timeout: Duration,
    ) -> McpResult<InitializeOutcome> {
        {
            let state = self.state.lock();
            if *state != SessionState::Connecting {
                return Err(McpError::WrongState { state: state_name(*state), expected: "connecting" });
            }
        }
        self.transition(SessionState::Initializing);

        let params = json!({
            "protocolVersion": "2024-11-05",
            "clientInfo": { "name": capabilities.name, "version": capabilities.version },
            "capabilities": {},
        });

        let result = self.call("initialize", Some(params), timeout).await;
        match result {
            Ok(value) => {
                self.transition(SessionState::Ready);
                Ok(InitializeOutcome {
                    server_name: value
                        .get("serverInfo")
                        .and_then(|i| i.get("name"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    server_version: value
                        .get("serverInfo")
                        .and_then(|i| i.get("version"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    raw: value,
                })
            }
            Err(err) => {
                self.transition(SessionState::Closed);
                Err(McpError::InitializeFailed(err.to_string()))
            }
        }
    }

    /// `tools/list` (spec §4.4, §6).
    ///
    /// # Errors
    /// See [`McpClient::call`].
    pub async fn tools_list(&self, timeout: Duration) -> McpResult<Vec<ToolDescriptor>> {
        let value = self.call("tools/list", None, timeout).await?;
        let tools = value.get("tools").and_then(Value::as_array).cloned().unwrap_or_default();
        Ok(tools
            .into_iter()
            .filter_map(|t| {
                let tool_name = t.get("name")?.as_str()?.to_string();
                Some(ToolDescriptor {
                    server_id: self.server_id,
                    tool_name,
                    input_schema: t.get("inputSchema").cloned().unwrap_or(Value::Null),
                    output_hint: t.get("description").and_then(Value::as_str).map(str::to_string),
                })
            })
            .collect())
    }

    /// `resources/list` (spec §6).
    ///
    /// # Errors
    /// See [`McpClient::call`].
    pub async fn resources_list(&self, timeout: Duration) -> McpResult<Vec<ResourceDescriptor>> {
        let value = self.call("resources/list", None, timeout).await?;
        let resources = value.get("resources").and_then(Value::as_array).cloned().unwrap_or_default();
        Ok(resources
            .into_iter()
            .filter_map(|r| {
                let uri = r.get("uri")?.as_str()?.to_string();
                Some(ResourceDescriptor {
                    uri,
                    name: r.get("name").and_then(Value::as_str).map(str::to_string),
                    mime_type: r.get("mimeType").and_then(Value::as_str).map(str::to_string),
                })
            })
            .collect())
    }

    /// `prompts/list` (spec §6).
    ///
    /// # Errors
    /// See [`McpClient::call`].
    pub async fn prompts_list(&self, timeout: Duration) -> McpResult<Vec<PromptDescriptor>> {
        let value = self.call("prompts/list", None, timeout).await?;
        let prompts = value.get("prompts").and_then(Value::as_array).cloned().unwrap_or_default();
        Ok(prompts
            .into_iter()
            .filter_map(|p| {
                let name = p.get("name")?.as_str()?.to_string();
                Some(PromptDescriptor {
                    name,
                    description: p.get("description").and_then(Value::as_str).map(str::to_string),
                })
            })
            .collect())
    }

    /// `tools/call` (spec §6). The returned payload is opaque to the daemon
    /// and forwarded to the Router's caller verbatim.
    ///
    /// # Errors
    /// See [`McpClient::call`].
    pub async fn tools_call(&self, name: &str, arguments: Value, timeout: Duration) -> McpResult<Value> {
        self.call("tools/call", Some(json!({ "name": name, "arguments": arguments })), timeout).await
    }

    /// `resources/read` (spec §6).
    ///
    /// # Errors
    /// See [`McpClient::call`].
    pub async fn resources_read(&self, uri: &str, timeout: Duration) -> McpResult<Value> {
        self.call("resources/read", Some(json!({ "uri": uri })), timeout).await
    }

    /// `prompts/get` (spec §6).
    ///
    /// # Errors
    /// See [`McpClient::call`].
    pub async fn prompts_get(&self, name: &str, arguments: Value, timeout: Duration) -> McpResult<Value> {
        self.call("prompts/get", Some(json!({ "name": name, "arguments": arguments })), timeout).await
    }

    /// Send an arbitrary request and await its response, racing the
    /// caller-supplied `timeout` (spec §4.4 request flow).
    ///
    /// # Errors
    /// Returns [`McpError::WrongState`] if the session does not accept calls
    /// (any method other than `initialize` while not `ready`),
    /// [`McpError::Timeout`] if `timeout` elapses first,
    /// [`McpError::ServerError`] if the peer returns a JSON-RPC error, or a
    /// transport/codec error if the call could not be sent at all.
    pub async fn call(&self, method: &'static str, params: Option<Value>, timeout: Duration) -> McpResult<Value> {
        if method != "initialize" {
            let state = self.state.lock();
            if !state.accepts_calls() {
                return Err(McpError::WrongState { state: state_name(*state), expected: "ready" });
            }
        }

        let id = self.idgen.next_id();
        let deadline = Instant::now() + timeout;
        let rx = self.pending.insert(id.clone(), method, deadline);

        let request = Request::new(id.clone(), method, params);
        let bytes = aperture_rpc::encode(&Message::Request(request));
        if let Err(err) = self.transport.send(&bytes).await {
            self.pending.expire(&id);
            return Err(McpError::Transport(err));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_recv_dropped)) => Err(McpError::Timeout),
            Err(_elapsed) => {
                self.pending.expire(&id);
                Err(McpError::Timeout)
            }
        }
    }

    /// Send a fire-and-forget notification.
    ///
    /// # Errors
    /// Returns a transport error if the frame could not be written.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> McpResult<()> {
        let notification = Notification::new(method, params);
        let bytes = aperture_rpc::encode(&Message::Notification(notification));
        self.transport.send(&bytes).await.map_err(McpError::Transport)
    }

    /// Cancel one in-flight request. Best-effort: a `notifications/cancelled`
    /// is sent to the peer if it supports cancellation, but the local waiter
    /// is failed immediately regardless of whether that notification lands
    /// (spec §4.4).
    pub async fn cancel(&self, id: &aperture_rpc::RpcId) {
        if let Some(method) = self.pending.cancel(id) {
            debug!(server_id = %self.server_id, %id, method, "cancelling in-flight request");
            let _ = self.notify("notifications/cancelled", Some(json!({ "requestId": rpc_id_json(id) }))).await;
        }
    }

    /// Gracefully close the session: transition `ready → closing → closed`
    /// and tear down the transport.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state == SessionState::Ready {
                *state = SessionState::Closing;
            }
        }
        let _ = self.transport.close().await;
        self.pending.fail_all_with_transport_error(aperture_transport::TransportError::AlreadyClosed);
        self.transition(SessionState::Closed);
        if let Some(handle) = self.dispatch.lock().take() {
            handle.abort();
        }
    }

    async fn dispatch_loop(&self) {
        loop {
            match self.transport.receive().await {
                Ok(bytes) => self.handle_incoming(&bytes),
                Err(err) => {
                    if *self.state.lock() == SessionState::Closed {
                        return;
                    }
                    warn!(server_id = %self.server_id, error = %err, "transport failed, closing session");
                    self.pending.fail_all_with_transport_error(err);
                    self.transition(SessionState::Closed);
                    return;
                }
            }
        }
    }

    fn handle_incoming(&self, bytes: &[u8]) {
        match aperture_rpc::decode(bytes) {
            Ok(message) => self.route_message(message),
            Err(err) => {
                error!(server_id = %self.server_id, error = %err, "received malformed message from server");
            }
        }
    }

    fn route_message(&self, message: Message) {
        match message {
            Message::Response(response) => {
                if let Some(id) = response.id {
                    if let Some(error) = response.error {
                        self.pending.resolve_error(&id, error);
                    } else {
                        self.pending.resolve_success(&id, response.result.unwrap_or(Value::Null));
                    }
                }
            }
            Message::Batch(messages) => {
                for m in messages {
                    self.route_message(m);
                }
            }
            // The client never serves inbound requests/notifications; a
            // well-behaved server only sends responses and notifications.
            Message::Request(_) | Message::Notification(_) => {}
        }
    }

    fn transition(&self, next: SessionState) {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            warn!(server_id = %self.server_id, from = ?*state, to = ?next, "illegal session state transition suppressed");
            return;
        }
        let from = *state;
        *state = next;
        drop(state);
        if let Some(events) = &self.events {
            events.publish(ApertureEvent::ServerProcessStateChanged {
                at: Timestamp::now(),
                server_id: self.server_id,
                state: format!("{next:?}").to_lowercase(),
            });
        }
        debug!(server_id = %self.server_id, ?from, to = ?next, "session state transitioned");
    }
}

fn state_name(state: SessionState) -> &'static str {
    match state {
        SessionState::Disconnected => "disconnected",
        SessionState::Connecting => "connecting",
        SessionState::Initializing => "initializing",
        SessionState::Ready => "ready",
        SessionState::Closing => "closing",
        SessionState::Closed => "closed",
    }
}

fn rpc_id_json(id: &aperture_rpc::RpcId) -> Value {
    serde_json::to_value(id).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_transport::LineTransport;

    async fn connected_pair() -> (McpClient, LineTransport<tokio::io::ReadHalf<tokio::io::DuplexStream>, tokio::io::WriteHalf<tokio::io::DuplexStream>>) {
        let (client_io, server_io) = tokio::io::duplex(8192);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, server_write) = tokio::io::split(server_io);
        let client_transport: Arc<dyn Transport> = Arc::new(LineTransport::new(client_read, client_write));
        let server_transport = LineTransport::new(server_read, server_write);
        let client = McpClient::new(ServerId::new(), client_transport);
        client.start();
        (client, server_transport)
    }

    #[tokio::test]
    async fn initialize_handshake_reaches_ready() {
        let (client, server) = connected_pair().await;

        let server_task = tokio::spawn(async move {
            let frame = server.receive().await.unwrap();
            let msg = aperture_rpc::decode(&frame).unwrap();
            let Message::Request(req) = msg else { panic!("expected initialize request") };
            let response = Response::success(
                req.id,
                json!({ "serverInfo": { "name": "demo", "version": "1.0" } }),
            );
            server.send(&aperture_rpc::encode(&Message::Response(response))).await.unwrap();
        });

        let outcome = client
            .initialize(&ClientCapabilities::default(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(outcome.server_name.as_deref(), Some("demo"));
        assert_eq!(client.state(), SessionState::Ready);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn call_before_ready_is_rejected() {
        let (client, _server) = connected_pair().await;
        let err = client.tools_call("read_file", json!({}), Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, McpError::WrongState { .. }));
    }

    #[tokio::test]
    async fn call_times_out_when_no_response_arrives() {
        let (client, _server) = connected_pair().await;
        {
            let mut state = client.state.lock();
            *state = SessionState::Ready;
        }
        let err = client.call("tools/list", None, Duration::from_millis(30)).await.unwrap_err();
        assert!(matches!(err, McpError::Timeout));
        assert!(client.pending_count() == 0);
    }

    #[tokio::test]
    async fn transport_failure_fails_outstanding_requests_and_closes() {
        let (client, server) = connected_pair().await;
        {
            let mut state = client.state.lock();
            *state = SessionState::Ready;
        }
        let call = tokio::spawn({
            let client = client.clone();
            async move { client.call("tools/list", None, Duration::from_secs(5)).await }
        });
        // Give the call time to register before the peer disappears.
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(server);

        let result = call.await.unwrap();
        assert!(matches!(result, Err(McpError::Transport(_))));
        assert_eq!(client.state(), SessionState::Closed);
    }
}
