//! Versioned record engine for the Nigori store.
//!
//! Each registered user owns an independent namespace of opaque records.
//! Records are never overwritten in place: every write creates an immutable
//! record at a new [`Revision`](nigori_types::Revision), and a small lookup
//! entity names the revision that is currently live. Conditional updates
//! compare the caller's expected revision against that lookup and swap it
//! atomically, or reject.
//!
//! # Architecture
//!
//! - The **user registry** maps public keys to [`User`](nigori_types::User)s.
//! - The **lookup index** maps (user, key) to the live revision.
//! - The **record store** maps (user, key, revision) to an immutable value.
//! - The **storage engine** composes the three behind the [`Database`]
//!   contract, running each operation as one substrate session.
//!
//! # Modules
//!
//! - [`error`]: Error types for engine operations
//! - [`config`]: [`EngineConfig`] and the [`RetentionPolicy`]
//! - [`traits`]: The [`Database`] trait
//! - [`registry`], [`lookup`], [`records`]: The three entity owners
//! - [`engine`]: The [`StorageEngine`] facade

pub mod config;
pub mod engine;
mod entity;
pub mod error;
pub mod lookup;
pub mod records;
pub mod registry;
pub mod traits;

pub use config::{EngineConfig, RetentionPolicy};
pub use engine::StorageEngine;
pub use error::{EngineError, EngineResult};
pub use lookup::{Lookup, LookupIndex};
pub use records::RecordStore;
pub use registry::UserRegistry;
pub use traits::Database;
