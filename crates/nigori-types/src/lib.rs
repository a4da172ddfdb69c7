//! Foundation types for the Nigori store.
//!
//! This crate provides the identity, versioning and key-encoding types used
//! throughout the Nigori workspace. Every other Nigori crate depends on
//! `nigori-types`.
//!
//! # Key Types
//!
//! - [`PublicKey`]: Opaque user identity presented by the transport layer
//! - [`UserId`]: Fixed-size namespace identifier derived from a public key
//! - [`User`]: A registered namespace owner with creation metadata
//! - [`Revision`]: Totally ordered version of a record's value
//! - [`RecordKey`]: Opaque key naming one record lineage
//! - [`StorageKey`]: Injective, length-prefixed encoding of entity keys
//! - [`Timestamp`]: Wall-clock milliseconds for creation metadata

pub mod error;
pub mod identity;
pub mod key;
pub mod revision;
pub mod temporal;

pub use error::TypeError;
pub use identity::{PublicKey, User, UserId};
pub use key::{KeyKind, RecordKey, StorageKey, MAX_FIELD_LEN};
pub use revision::Revision;
pub use temporal::Timestamp;
