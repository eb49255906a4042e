//! The wire-facing JSON-RPC error object, and this crate's own error type.

use aperture_core::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC error object, as it appears in a [`crate::Response::error`]
/// field (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("rpc error {code}: {message}")]
pub struct RpcError {
    /// The JSON-RPC error code (spec §4.2, §7 error taxonomy).
    pub code: i64,
    /// A short, human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Build an error object from a canonical [`ErrorKind`] and message.
    #[must_use]
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { code: kind.rpc_code(), message: message.into(), data: None }
    }

    /// Attach structured detail to an error object.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Classify this error object back onto a canonical [`ErrorKind`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_rpc_code(self.code)
    }

    /// The `-32700 parse error` response for input that could not be parsed
    /// as JSON at all.
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::ParseError, message)
    }

    /// The `-32600 invalid request` response for input that parsed as JSON
    /// but did not form a valid JSON-RPC envelope.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::InvalidRequest, message)
    }

    /// The `-32601 method not found` response.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::from_kind(ErrorKind::MethodNotFound, format!("method not found: {method}"))
    }

    /// The `-32602 invalid params` response.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::InvalidParams, message)
    }
}

/// Errors raised while parsing or validating raw bytes as JSON-RPC.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The bytes were not valid JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),
    /// The JSON parsed but did not form a valid request, response, or
    /// notification envelope.
    #[error("invalid JSON-RPC envelope: {0}")]
    InvalidEnvelope(String),
    /// A batch array was present but empty.
    #[error("batch must not be empty")]
    EmptyBatch,
}

impl CodecError {
    /// The [`ErrorKind`] this codec failure maps onto.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedJson(_) => ErrorKind::ParseError,
            Self::InvalidEnvelope(_) | Self::EmptyBatch => ErrorKind::InvalidRequest,
        }
    }

    /// Render this failure as the [`RpcError`] a peer would see on the wire.
    #[must_use]
    pub fn to_rpc_error(&self) -> RpcError {
        RpcError::from_kind(self.kind(), self.to_string())
    }
}

/// Result alias for this crate's fallible operations.
pub type CodecResult<T> = Result<T, CodecError>;
