//! Audit log error types.

/// Errors from audit-log operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The underlying store failed to persist or retrieve a record.
    #[error("audit storage error: {0}")]
    Storage(#[from] aperture_storage::StorageError),

    /// A stored record failed to (de)serialize.
    #[error("audit serialization error: {0}")]
    Serialization(String),

    /// A record's `previous_hash` does not match the actual hash of its
    /// predecessor; the chain has been tampered with or corrupted.
    #[error("audit chain broken at entry {entry_id}: expected predecessor hash {expected}, found {actual}")]
    ChainBroken {
        /// The entry whose link is broken.
        entry_id: String,
        /// The hash its `previous_hash` field should have matched.
        expected: String,
        /// The hash actually found on the preceding entry.
        actual: String,
    },
}

/// Result type for audit-log operations.
pub type AuditResult<T> = Result<T, AuditError>;
