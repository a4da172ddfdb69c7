/// Errors from substrate operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another session committed a change to a key this session read.
    ///
    /// The whole unit of work may be retried from the start.
    #[error("commit conflict on key {}", hex::encode(.key))]
    Conflict { key: Vec<u8> },

    /// The backend is unavailable or internally inconsistent.
    #[error("backend failure: {0}")]
    Backend(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A snapshot file failed validation.
    #[error("corrupt snapshot: {reason}")]
    CorruptSnapshot { reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` if retrying the unit of work may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
