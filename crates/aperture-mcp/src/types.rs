//! Types exchanged during and after the MCP handshake (spec §3, §6).

use aperture_core::ServerId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-side capabilities advertised during `initialize` (spec §4.4, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Client/daemon name reported to the server.
    pub name: String,
    /// Client/daemon version reported to the server.
    pub version: String,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self { name: "aperture".to_string(), version: env!("CARGO_PKG_VERSION").to_string() }
    }
}

/// One tool the server advertised via `tools/list`, learned once per session
/// and re-derived on reconnect (spec §3 `ToolDescriptor`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    /// The server that advertises this tool.
    pub server_id: ServerId,
    /// The tool's name, as passed to `tools/call`.
    pub tool_name: String,
    /// The tool's declared JSON Schema for arguments.
    pub input_schema: Value,
    /// A short, human-readable hint about what the tool returns.
    pub output_hint: Option<String>,
}

/// A resource descriptor learned via `resources/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDescriptor {
    /// The resource's URI.
    pub uri: String,
    /// A human-readable name.
    pub name: Option<String>,
    /// The resource's declared MIME type, if any.
    pub mime_type: Option<String>,
}

/// A prompt descriptor learned via `prompts/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptDescriptor {
    /// The prompt's name, as passed to `prompts/get`.
    pub name: String,
    /// A human-readable description.
    pub description: Option<String>,
}

/// The server's response to `initialize`: the union of everything the
/// handshake learns in one round trip.
#[derive(Debug, Clone, Default)]
pub struct InitializeOutcome {
    /// The server's self-reported name, if advertised.
    pub server_name: Option<String>,
    /// The server's self-reported version, if advertised.
    pub server_version: Option<String>,
    /// The raw `initialize` result payload, for diagnostics.
    pub raw: Value,
}
