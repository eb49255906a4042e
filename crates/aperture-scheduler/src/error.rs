//! Errors raised by the Clock/Scheduler (spec §4.1).

use aperture_core::ErrorKind;

/// Failures raised while registering or controlling a named tick.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// No tick is registered under the given name.
    #[error("no tick named {0}")]
    UnknownTick(String),
    /// A tick was registered twice under the same name.
    #[error("tick {0} is already registered")]
    AlreadyRegistered(String),
}

impl SchedulerError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTick(_) => ErrorKind::ResourceNotFound,
            Self::AlreadyRegistered(_) => ErrorKind::Internal,
        }
    }
}

/// Result alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
