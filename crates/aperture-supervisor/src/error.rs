//! Errors raised while spawning, monitoring, or stopping a supervised server
//! (spec §4.13).

use aperture_core::{ErrorKind, ServerId};

/// Failures the Supervisor can report to the Orchestrator or the admin surface.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// The child process could not be spawned.
    #[error("failed to spawn server process: {0}")]
    SpawnFailed(String),
    /// The `initialize`/`tools/list` handshake failed after spawn.
    #[error("protocol handshake failed: {0}")]
    Handshake(#[source] aperture_mcp::McpError),
    /// No server is registered under the given id.
    #[error("no supervised server with id {0}")]
    NotFound(ServerId),
    /// `max_children` is already at capacity.
    #[error("supervisor is at capacity")]
    CapacityExhausted,
    /// The server did not exit within its stop grace period and had to be killed.
    #[error("server did not stop gracefully within the grace period")]
    StopTimedOut,
    /// A reinstall was required by the escalation ladder but no
    /// [`crate::supervisor::Reinstaller`] was configured.
    #[error("escalation reached reinstall but no reinstaller is configured")]
    ReinstallUnavailable,
    /// The configured reinstaller failed.
    #[error("reinstall failed: {0}")]
    ReinstallFailed(String),
}

impl SupervisorError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SpawnFailed(_) | Self::Handshake(_) | Self::ReinstallFailed(_) => {
                ErrorKind::InstallFailed
            }
            Self::NotFound(_) => ErrorKind::ResourceNotFound,
            Self::CapacityExhausted => ErrorKind::CapacityExhausted,
            Self::StopTimedOut => ErrorKind::Timeout,
            Self::ReinstallUnavailable => ErrorKind::Internal,
        }
    }
}

/// Result alias for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
