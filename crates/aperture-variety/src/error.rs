//! Errors raised while computing variety samples (spec §4.15).

use aperture_core::ErrorKind;

/// Failures raised by the Variety Engine.
#[derive(Debug, thiserror::Error)]
pub enum VarietyError {
    /// `environmental_variety` computed to zero or negative; the ratio is undefined.
    #[error("environmental variety must be positive, got {0}")]
    DegenerateEnvironment(f64),
}

impl VarietyError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DegenerateEnvironment(_) => ErrorKind::Internal,
        }
    }
}

/// Result alias for Variety Engine operations.
pub type VarietyResult<T> = Result<T, VarietyError>;
