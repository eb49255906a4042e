//! Errors raised while discovering candidates (spec §4.10).

use aperture_core::ErrorKind;

/// Failures the discovery engine or an individual catalog adapter can raise.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A catalog adapter's query failed (network error, non-2xx status, bad payload).
    #[error("catalog {source} query failed: {message}")]
    AdapterFailed {
        /// The adapter's source tag.
        source: String,
        /// A human-readable description of the failure.
        message: String,
    },
    /// The overall fan-out deadline elapsed before every adapter replied.
    #[error("discovery deadline elapsed with {completed}/{total} adapters replied")]
    DeadlineElapsed {
        /// Adapters that replied before the deadline.
        completed: usize,
        /// Total adapters queried.
        total: usize,
    },
    /// No adapter returned any candidate and the deadline was not a factor.
    #[error("no candidates found for capability {0}")]
    NoCandidates(String),
}

impl DiscoveryError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AdapterFailed { .. } | Self::DeadlineElapsed { .. } | Self::NoCandidates(_) => {
                ErrorKind::CapabilityUnavailable
            }
        }
    }
}

/// Result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
