use crate::error::StoreResult;

/// One transaction against the substrate.
///
/// Reads see the session's own buffered writes. Nothing becomes visible to
/// other sessions until [`commit`](Session::commit) succeeds, and the whole
/// write set is applied atomically. Dropping a session without committing
/// discards its writes, so a session acquired at the top of an operation is
/// released on every exit path, including `?` returns.
pub trait Session {
    /// Read the object stored at `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` at `key`, replacing any previous object.
    fn put(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()>;

    /// Remove the object at `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> StoreResult<()>;

    /// Atomically apply every buffered write.
    ///
    /// Fails with [`StoreError::Conflict`](crate::StoreError::Conflict) if a
    /// key this session read was changed by another session since it was
    /// read; in that case nothing is applied.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Handle to a transactional key-object store.
///
/// Implementations must be thread-safe (`Send + Sync`): the engine shares a
/// single handle across every caller and opens one session per operation.
/// Keys and values are opaque bytes; the store never interprets them.
pub trait KvStore: Send + Sync {
    /// Open a new session. The session is released when dropped.
    fn session(&self) -> StoreResult<Box<dyn Session + '_>>;
}
