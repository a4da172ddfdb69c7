//! The [`Database`] trait: the contract the request layer programs against.

use nigori_types::{Revision, User};

use crate::error::EngineResult;

/// Versioned, per-user record storage.
///
/// Public keys and record keys are opaque, non-empty byte strings; values
/// are opaque bytes (typically already encrypted by the client). Ordinary
/// negative outcomes come back as `false` / `None`. Errors are reserved for
/// malformed input ([`InvalidArgument`]), a missing user where one is
/// required ([`UserNotFound`]), and substrate faults ([`StorageFailure`]).
///
/// Implementations must be thread-safe: callers share one instance and never
/// hold an engine lock across calls.
///
/// [`InvalidArgument`]: crate::EngineError::InvalidArgument
/// [`UserNotFound`]: crate::EngineError::UserNotFound
/// [`StorageFailure`]: crate::EngineError::StorageFailure
pub trait Database: Send + Sync {
    /// Returns `true` if a user is registered under `public_key`.
    fn have_user(&self, public_key: &[u8]) -> EngineResult<bool>;

    /// Register `public_key`.
    ///
    /// Returns `false`, changing nothing, if it is already registered. Of
    /// several concurrent registrations of one key, exactly one returns
    /// `true`.
    fn add_user(&self, public_key: &[u8]) -> EngineResult<bool>;

    /// Remove `user`.
    ///
    /// Idempotent: returns `true` whether or not the user was still
    /// registered, meaning no registration remains. Substrate failures are
    /// returned as errors.
    ///
    /// Only the registration is removed. The user's records stay in place,
    /// and since the namespace is derived from the public key, registering
    /// the same key again makes them readable and writable once more.
    fn delete_user(&self, user: &User) -> EngineResult<bool>;

    /// Fetch the user registered under `public_key`.
    fn get_user(&self, public_key: &[u8]) -> EngineResult<User>;

    /// Read the current value of `key`, or `None` if it has none.
    fn get_record(&self, user: &User, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Write `value` as the next revision of `key`, creating it if needed.
    ///
    /// No revision check is made, but a key under constant contention can
    /// still run out of commit retries and fail with `StorageFailure`.
    fn put_record(&self, user: &User, key: &[u8], value: &[u8]) -> EngineResult<bool>;

    /// Write `value` at `new_revision` only if `expected` is the current
    /// revision of `key`.
    ///
    /// Returns `false` if `key` does not exist or `expected` is stale.
    /// `new_revision` must be greater than `expected`.
    fn update_record(
        &self,
        user: &User,
        key: &[u8],
        value: &[u8],
        expected: Revision,
        new_revision: Revision,
    ) -> EngineResult<bool>;

    /// Delete `key` and its values.
    ///
    /// Returns `false` if there was nothing to delete.
    fn delete_record(&self, user: &User, key: &[u8]) -> EngineResult<bool>;
}
