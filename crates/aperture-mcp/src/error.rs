//! Errors raised by the MCP client (spec §4.4).

use aperture_core::ErrorKind;

/// Failures the MCP client can report to a caller or to the Supervisor.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] aperture_transport::TransportError),
    /// A request's deadline elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,
    /// The session is not in a state that admits this operation.
    #[error("session is {state}, expected {expected}")]
    WrongState {
        /// The session's actual state at the time of the call.
        state: &'static str,
        /// The state the call required.
        expected: &'static str,
    },
    /// The `initialize` handshake failed or the peer returned an error.
    #[error("initialize failed: {0}")]
    InitializeFailed(String),
    /// The peer returned a JSON-RPC error in response to a request.
    #[error("server returned an error: {0}")]
    ServerError(#[from] aperture_rpc::RpcError),
    /// The peer's response could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// A codec-level failure while encoding or decoding a message.
    #[error("codec error: {0}")]
    Codec(#[from] aperture_rpc::CodecError),
    /// The caller cancelled the request before it completed.
    #[error("request was cancelled")]
    Cancelled,
}

impl McpError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::TransportError,
            Self::Timeout => ErrorKind::Timeout,
            Self::WrongState { .. } | Self::Cancelled => ErrorKind::Internal,
            Self::InitializeFailed(_) => ErrorKind::TransportError,
            Self::ServerError(rpc) => rpc.kind(),
            Self::MalformedResponse(_) => ErrorKind::ParseError,
            Self::Codec(err) => err.kind(),
        }
    }
}

/// Result alias for MCP client operations.
pub type McpResult<T> = Result<T, McpError>;
