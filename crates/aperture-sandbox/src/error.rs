//! Errors raised while verifying a freshly installed server (spec §4.12).

use aperture_core::{CapabilityName, ErrorKind};

/// Failures raised during sandboxed verification. Any one of these aborts
/// the verification pipeline; the partially-completed stages are reported
/// to the caller as part of the failed verdict rather than lost.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The child could not be spawned at all.
    #[error("failed to spawn sandboxed process: {0}")]
    SpawnFailed(String),
    /// The `initialize`/`tools/list` handshake failed.
    #[error("protocol compliance check failed: {0}")]
    ProtocolFailure(#[source] aperture_mcp::McpError),
    /// A declared capability's canonical probe call failed or returned an
    /// unexpected shape.
    #[error("capability probe failed for '{capability}': {reason}")]
    CapabilityProbeFailed {
        /// The capability whose probe failed.
        capability: CapabilityName,
        /// Why the probe was rejected.
        reason: String,
    },
    /// A malformed-request or unknown-method negative test did not produce
    /// the expected JSON-RPC error.
    #[error("negative test '{case}' did not behave as expected: {reason}")]
    NegativeTestFailed {
        /// Which negative test failed (`unknown_method` or `malformed_request`).
        case: &'static str,
        /// What was observed instead.
        reason: String,
    },
    /// The whole verification run exceeded its wall-clock deadline.
    #[error("verification deadline exceeded")]
    DeadlineExceeded,
}

impl SandboxError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeadlineExceeded => ErrorKind::Timeout,
            _ => ErrorKind::VerifyFailed,
        }
    }
}

/// Result alias for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
