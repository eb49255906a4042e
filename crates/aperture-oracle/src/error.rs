//! Errors raised while consulting an advisory oracle (spec §4.17).

use aperture_core::ErrorKind;

/// Failures a concrete [`crate::oracle::AdvisoryOracle`] may raise. Never
/// propagated to the caller of [`crate::oracle::consult`] — a failed or slow
/// oracle call is logged and treated as "no opinion" (spec §4.17
/// "non-blocking").
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The oracle implementation returned an error for this candidate.
    #[error("oracle call failed: {0}")]
    CallFailed(String),
}

impl OracleError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

/// Result alias for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;
