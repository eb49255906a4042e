//! Errors raised by the resilience primitives.

use aperture_core::ErrorKind;

/// Failures raised by the breaker, pool, rate limiter, and DLQ.
#[derive(Debug, thiserror::Error)]
pub enum ResilienceError {
    /// The breaker protecting this target is open.
    #[error("circuit is open")]
    CircuitOpen,
    /// The sliding-window rate limit was exceeded.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Hint for how long the caller should wait before retrying.
        retry_after_ms: u64,
    },
    /// No pooled session became available before the caller's deadline.
    #[error("pool exhausted")]
    PoolExhausted,
    /// The DLQ does not contain an entry with the given id.
    #[error("dlq entry not found")]
    EntryNotFound,
    /// Persisting to or reading from the backing store failed.
    #[error("storage error: {0}")]
    Storage(#[from] aperture_storage::StorageError),
}

impl ResilienceError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CircuitOpen => ErrorKind::CircuitOpen,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::PoolExhausted => ErrorKind::CapacityExhausted,
            Self::EntryNotFound => ErrorKind::ResourceNotFound,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

/// Result alias for resilience operations.
pub type ResilienceResult<T> = Result<T, ResilienceError>;
