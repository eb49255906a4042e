//! Errors raised by the [`crate::AdminApi`] surface (spec §4.18).

use aperture_core::{DlqEntryId, ErrorKind, JobId};

/// Failures reported to an admin caller.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// No acquisition job with the given id.
    #[error("no acquisition job with id {0}")]
    UnknownJob(JobId),
    /// No dead-letter entry with the given id.
    #[error("no dlq entry with id {0}")]
    UnknownDlqEntry(DlqEntryId),
    /// The Orchestrator rejected the request.
    #[error(transparent)]
    Orchestrator(#[from] aperture_orchestrator::OrchestratorError),
    /// The Supervisor rejected the request.
    #[error(transparent)]
    Supervisor(#[from] aperture_supervisor::SupervisorError),
    /// The DLQ or another resilience primitive rejected the request.
    #[error(transparent)]
    Resilience(#[from] aperture_resilience::ResilienceError),
    /// Replaying a dead-lettered call through the Router failed.
    #[error(transparent)]
    Router(#[from] aperture_registry::RouterError),
    /// Reloading configuration failed.
    #[error("failed to reload configuration: {0}")]
    ConfigReload(String),
}

impl AdminError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownJob(_) | Self::UnknownDlqEntry(_) => ErrorKind::ResourceNotFound,
            Self::Orchestrator(err) => err.kind(),
            Self::Supervisor(err) => err.kind(),
            Self::Resilience(err) => err.kind(),
            Self::Router(err) => err.kind(),
            Self::ConfigReload(_) => ErrorKind::Internal,
        }
    }
}

/// Result alias for admin operations.
pub type AdminResult<T> = Result<T, AdminError>;
