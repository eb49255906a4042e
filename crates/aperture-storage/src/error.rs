//! Storage error types.

/// Errors from persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested key or item was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The underlying store failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// The store could not be opened or connected to.
    #[error("connection error: {0}")]
    Connection(String),

    /// Serialization or deserialization of a stored record failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The namespace or key is invalid (empty, or contains a reserved byte).
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
