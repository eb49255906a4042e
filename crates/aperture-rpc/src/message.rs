//! JSON-RPC 2.0 message types (spec §4.2).
//!
//! Requests, responses, and notifications are distinguished on the wire by
//! which fields are present, not by a tag — exactly as JSON-RPC 2.0 defines
//! them. [`Message`] is the parsed, validated union of all three plus a
//! batch; [`RpcId`] is the wire identifier, which may be a string or an
//! integer but, per spec, is never `null` on a request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// The only protocol version this implementation accepts.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request or response identifier.
///
/// Untagged so it serializes as a bare JSON string or number, matching the
/// wire format exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    /// A numeric identifier, as produced by [`crate::idgen::RpcIdGenerator`].
    Number(i64),
    /// A string identifier, accepted from servers that prefer string ids.
    String(String),
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RpcId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<u64> for RpcId {
    fn from(value: u64) -> Self {
        Self::Number(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// A JSON-RPC request: expects exactly one response, correlated by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlates the eventual response.
    pub id: RpcId,
    /// The method name, e.g. `"tools/call"`.
    pub method: String,
    /// Method parameters, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// Build a request with the given id, method, and optional params.
    #[must_use]
    pub fn new(id: RpcId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, method: method.into(), params }
    }
}

/// A JSON-RPC notification: fire-and-forget, carries no `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The method name, e.g. `"notifications/cancelled"`.
    pub method: String,
    /// Method parameters, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    /// Build a notification with the given method and optional params.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), method: method.into(), params }
    }
}

/// A JSON-RPC response: carries exactly one of `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The id of the request this responds to. `null` only for a
    /// whole-batch parse error, per spec.
    pub id: Option<RpcId>,
    /// The successful result, if this is a success response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error, if this is an error response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Build a success response.
    #[must_use]
    pub fn success(id: RpcId, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id: Some(id), result: Some(result), error: None }
    }

    /// Build an error response for a known request id.
    #[must_use]
    pub fn failure(id: Option<RpcId>, error: RpcError) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: None, error: Some(error) }
    }

    /// Whether this response carries a success result.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

/// The parsed, validated union of everything that can appear on the wire.
#[derive(Debug, Clone)]
pub enum Message {
    /// A single request.
    Request(Request),
    /// A single notification.
    Notification(Notification),
    /// A single response.
    Response(Response),
    /// A non-empty batch of requests/notifications/responses.
    Batch(Vec<Message>),
}

impl Message {
    /// `true` if this is a [`Message::Notification`] (no response expected).
    #[must_use]
    pub fn is_notification(&self) -> bool {
        matches!(self, Self::Notification(_))
    }
}
