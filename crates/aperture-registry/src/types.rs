//! Capability bindings, routable tasks, and routing outcomes (spec §4.14).

use aperture_core::{CapabilityName, ServerId};
use aperture_mcp::ToolDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A server currently bound to at least one capability, as the Registry
/// sees it — a read-only view, refreshed only by `register`/`unregister`
/// calls (spec §3 "Registry holds read-only views keyed by `server_id`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredServer {
    /// Identifies the server.
    pub server_id: ServerId,
    /// Capabilities this server provides.
    pub capabilities: Vec<CapabilityName>,
    /// Tools advertised by this server's `tools/list`.
    pub tools: Vec<ToolDescriptor>,
}

/// A unit of routable work: a capability, the tool that implements it on
/// the chosen server, and the arguments to pass.
#[derive(Debug, Clone)]
pub struct Task {
    /// The capability being invoked.
    pub capability: CapabilityName,
    /// The tool name to call, as advertised by `tools/list`.
    pub tool_name: String,
    /// Arguments passed to the tool.
    pub arguments: Value,
    /// Whether a terminal failure should be offered to the dead-letter queue.
    pub allow_dlq: bool,
}

impl Task {
    /// Build a task that does not opt into the dead-letter queue on failure.
    #[must_use]
    pub fn new(capability: CapabilityName, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self { capability, tool_name: tool_name.into(), arguments, allow_dlq: false }
    }

    /// Opt this task's terminal failures into the dead-letter queue.
    #[must_use]
    pub fn with_dlq(mut self) -> Self {
        self.allow_dlq = true;
        self
    }
}

/// The concrete pairing a successful route resolves to, before invocation.
#[derive(Debug, Clone, Copy)]
pub struct RouteTarget {
    /// The server selected to handle the call.
    pub server_id: ServerId,
}

/// The result of a completed route, for callers that want more than the
/// raw [`serde_json::Value`] payload.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    /// The server that handled the call.
    pub server_id: ServerId,
    /// The tool's raw JSON result.
    pub result: Value,
}
