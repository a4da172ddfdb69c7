//! Transactional key-object substrate for the Nigori store.
//!
//! The storage engine treats durable storage as an external collaborator: a
//! key-object store with get, put and delete, grouped into sessions that
//! commit atomically. This crate defines that boundary and ships the
//! in-memory backend used by tests, the CLI, and embedders.
//!
//! # Backends
//!
//! All backends implement the [`KvStore`] trait:
//!
//! - [`InMemoryKvStore`] -- `BTreeMap`-based store with optimistic
//!   concurrency control and file snapshots
//!
//! # Design Rules
//!
//! 1. A session is the unit of atomicity: all of its writes apply, or none do.
//! 2. A session that read a key conflicts with any commit that changed that
//!    key before it committed.
//! 3. Dropping a session releases it; uncommitted writes are discarded.
//! 4. The store never interprets keys or values.
//! 5. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryKvStore, StoreStats};
pub use traits::{KvStore, Session};
