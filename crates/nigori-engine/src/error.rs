//! Error types for engine operations.

use nigori_store::StoreError;
use nigori_types::{Revision, TypeError, UserId};
use thiserror::Error;

/// Errors that can occur during engine operations.
///
/// Ordinary negative outcomes (a key that was never written, a stale
/// conditional update through [`Database::update_record`]) are reported as
/// `None` / `false`, not as errors.
///
/// [`Database::update_record`]: crate::Database::update_record
#[derive(Debug, Error)]
pub enum EngineError {
    /// Empty or oversize identity fields, or a malformed revision request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No user is registered under the given public key.
    #[error("user not found: {user}")]
    UserNotFound { user: UserId },

    /// A conditional update named a revision that is no longer current.
    ///
    /// `actual` is `None` when the key has no live revision at all.
    #[error("revision conflict: expected {expected}, found {actual:?}")]
    ConflictRejected {
        expected: Revision,
        actual: Option<Revision>,
    },

    /// An immutable entity already exists at the target key.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The substrate reported a failure, or returned data that does not decode.
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StoreError),

    /// The engine configuration is invalid or unreadable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<TypeError> for EngineError {
    fn from(err: TypeError) -> Self {
        EngineError::InvalidArgument(err.to_string())
    }
}

/// Convenience type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
