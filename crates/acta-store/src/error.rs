/// Errors from entry store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend cannot serve requests right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A conditional write lost against a concurrent writer.
    #[error("version conflict on {key}: expected {expected}, found {found}")]
    Conflict {
        key: String,
        expected: String,
        found: String,
    },

    /// Tombstone requested for a key with no live value.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted log holds a damaged frame ahead of committed data.
    #[error("corrupt entry log at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
