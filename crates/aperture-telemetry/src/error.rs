//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The `EnvFilter` directive string could not be parsed.
    #[error("invalid log directive: {0}")]
    InvalidDirective(String),

    /// A global subscriber was already installed.
    #[error("global tracing subscriber already set")]
    AlreadyInitialized,
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
