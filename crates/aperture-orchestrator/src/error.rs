//! Errors raised while running or controlling an acquisition job (spec §4.16).

use aperture_core::{CapabilityName, ErrorKind};

/// A phase of the pipeline that can fail, for diagnostics and error mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fanning out to catalog adapters.
    Discovering,
    /// Scoring and ordering candidates.
    Ranking,
    /// Running the Installer.
    Installing,
    /// Running the Sandbox & Verifier.
    Verifying,
    /// Promoting the installation to the Supervisor and Registry.
    Registering,
}

impl Phase {
    /// A short, stable label, used in diagnostic records.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Discovering => "discovering",
            Self::Ranking => "ranking",
            Self::Installing => "installing",
            Self::Verifying => "verifying",
            Self::Registering => "registering",
        }
    }
}

/// Failures raised while driving an [`crate::job::AcquisitionJob`] through
/// its pipeline.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// No catalog adapter produced a candidate for the capability.
    #[error("discovery found no candidates for '{0}'")]
    NoCandidates(CapabilityName),
    /// The install pipeline failed.
    #[error("install failed: {0}")]
    InstallFailed(String),
    /// The verification pipeline failed.
    #[error("verification failed: {0}")]
    VerifyFailed(String),
    /// Promoting the installation to the Supervisor failed.
    #[error("registration failed: {0}")]
    RegisterFailed(String),
    /// A phase did not complete within its configured deadline.
    #[error("phase '{0}' exceeded its deadline")]
    DeadlineExceeded(&'static str),
    /// The job was cancelled before reaching `registering`.
    #[error("job was cancelled during '{0}'")]
    Cancelled(&'static str),
    /// No job exists with the given id.
    #[error("no job with that id")]
    UnknownJob,
    /// The job has already passed `registering` and can no longer be cancelled.
    #[error("job already committed, cannot cancel")]
    AlreadyCommitted,
}

impl OrchestratorError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCandidates(_) => ErrorKind::CapabilityUnavailable,
            Self::InstallFailed(_) => ErrorKind::InstallFailed,
            Self::VerifyFailed(_) => ErrorKind::VerifyFailed,
            Self::RegisterFailed(_) => ErrorKind::Internal,
            Self::DeadlineExceeded(_) => ErrorKind::Timeout,
            Self::Cancelled(_) => ErrorKind::Internal,
            Self::UnknownJob => ErrorKind::ResourceNotFound,
            Self::AlreadyCommitted => ErrorKind::InvalidRequest,
        }
    }
}

/// Result alias for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
