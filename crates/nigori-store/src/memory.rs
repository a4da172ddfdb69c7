//! In-memory transactional store for tests, the CLI, and embedding.
//!
//! [`InMemoryKvStore`] keeps every object in a `BTreeMap` behind a `RwLock`
//! and runs sessions under optimistic concurrency control: a session buffers
//! its writes, remembers the version of every key it reads, and at commit
//! time validates those versions under the write lock before applying
//! anything. The lock is only held for the duration of a single read or a
//! single commit, never across a caller's unit of work.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};
use crate::traits::{KvStore, Session};

/// A stored object and the commit that last wrote it.
#[derive(Clone, Debug)]
pub(crate) struct Versioned {
    pub(crate) version: u64,
    pub(crate) value: Vec<u8>,
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) entries: BTreeMap<Vec<u8>, Versioned>,
    /// Monotonic write counter; every applied write gets a fresh version.
    pub(crate) clock: u64,
}

/// Counters describing session outcomes since the store was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub commits: u64,
    pub conflicts: u64,
}

/// An in-memory implementation of [`KvStore`].
///
/// Data is lost when the store is dropped unless it is written out with
/// [`save_snapshot`](InMemoryKvStore::save_snapshot).
pub struct InMemoryKvStore {
    state: RwLock<StoreState>,
    commits: AtomicU64,
    conflicts: AtomicU64,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    pub(crate) fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
            commits: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
        }
    }

    pub(crate) fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_state()?.entries.len())
    }

    /// Returns `true` if the store holds no objects.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_state()?.entries.is_empty())
    }

    /// Read a committed object outside of any session.
    pub fn get_committed(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .read_state()?
            .entries
            .get(key)
            .map(|entry| entry.value.clone()))
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            commits: self.commits.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for InMemoryKvStore {
    fn session(&self) -> StoreResult<Box<dyn Session + '_>> {
        Ok(Box::new(MemorySession {
            store: self,
            reads: HashMap::new(),
            writes: BTreeMap::new(),
            committed: false,
        }))
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.read_state().map(|s| s.entries.len()).unwrap_or(0);
        f.debug_struct("InMemoryKvStore")
            .field("object_count", &count)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A session over an [`InMemoryKvStore`].
struct MemorySession<'a> {
    store: &'a InMemoryKvStore,
    /// Version observed at first read; `None` if the key was absent.
    reads: HashMap<Vec<u8>, Option<u64>>,
    /// Buffered writes; `None` is a delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    committed: bool,
}

impl Session for MemorySession<'_> {
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if let Some(pending) = self.writes.get(key) {
            return Ok(pending.clone());
        }
        let state = self.store.read_state()?;
        let entry = state.entries.get(key);
        self.reads
            .entry(key.to_vec())
            .or_insert_with(|| entry.map(|e| e.version));
        Ok(entry.map(|e| e.value.clone()))
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.writes.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        let mut state = self.store.write_state()?;

        for (key, observed) in &self.reads {
            let current = state.entries.get(key).map(|e| e.version);
            if current != *observed {
                self.store.conflicts.fetch_add(1, Ordering::Relaxed);
                debug!(
                    key = %hex::encode(key),
                    ?observed,
                    ?current,
                    "session commit rejected"
                );
                return Err(StoreError::Conflict { key: key.clone() });
            }
        }

        let writes = std::mem::take(&mut self.writes);
        let applied = writes.len();
        for (key, write) in writes {
            match write {
                Some(value) => {
                    state.clock += 1;
                    let version = state.clock;
                    state.entries.insert(key, Versioned { version, value });
                }
                None => {
                    state.entries.remove(&key);
                }
            }
        }
        drop(state);

        self.committed = true;
        self.store.commits.fetch_add(1, Ordering::Relaxed);
        trace!(applied, "session committed");
        Ok(())
    }
}

impl Drop for MemorySession<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.writes.is_empty() {
            trace!(discarded = self.writes.len(), "session dropped without commit");
        }
    }
}
