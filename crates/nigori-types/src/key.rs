//! Record keys and the composite storage-key encoding.
//!
//! Every entity the engine persists lives under a [`StorageKey`] in the
//! substrate. The encoding is a kind tag followed by length-prefixed fields:
//!
//! ```text
//! [1 byte: kind tag]
//! repeated: [4 bytes: field length (big-endian u32)] [N bytes: field]
//! ```
//!
//! Length prefixes make the encoding injective: no two distinct
//! (kind, fields...) tuples produce the same bytes, whatever the field
//! contents are. Fields are never joined with a delimiter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::{PublicKey, UserId};
use crate::revision::Revision;

/// Longest field a [`StorageKey`] can carry behind its `u32` length prefix.
pub const MAX_FIELD_LEN: usize = u32::MAX as usize;

/// Reject field lengths the storage-key encoding cannot represent.
pub(crate) fn check_field_len(field: &'static str, len: usize) -> Result<(), TypeError> {
    if len > MAX_FIELD_LEN {
        return Err(TypeError::TooLong {
            field,
            len,
            max: MAX_FIELD_LEN,
        });
    }
    Ok(())
}

/// An opaque, non-empty key naming one record lineage in a user namespace.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(Vec<u8>);

impl RecordKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, TypeError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TypeError::Empty {
                field: "record key",
            });
        }
        check_field_len("record key", bytes.len())?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "RecordKey({s:?})"),
            Err(_) => write!(f, "RecordKey(hex:{})", hex::encode(&self.0)),
        }
    }
}

/// The kind of entity a [`StorageKey`] addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyKind {
    User,
    Lookup,
    Record,
}

impl KeyKind {
    fn tag(self) -> u8 {
        match self {
            KeyKind::User => b'U',
            KeyKind::Lookup => b'L',
            KeyKind::Record => b'R',
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'U' => Some(KeyKind::User),
            b'L' => Some(KeyKind::Lookup),
            b'R' => Some(KeyKind::Record),
            _ => None,
        }
    }
}

/// Encoded substrate key for one persisted entity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(Vec<u8>);

impl StorageKey {
    /// Key of the user entity registered under `public_key`.
    pub fn user(public_key: &PublicKey) -> Self {
        Self::encode(KeyKind::User, &[public_key.as_bytes()])
    }

    /// Key of the lookup (head pointer) for `(owner, key)`.
    pub fn lookup(owner: &UserId, key: &RecordKey) -> Self {
        Self::encode(KeyKind::Lookup, &[owner.as_bytes(), key.as_bytes()])
    }

    /// Key of the record stored at `(owner, key, revision)`.
    pub fn record(owner: &UserId, key: &RecordKey, revision: Revision) -> Self {
        Self::encode(
            KeyKind::Record,
            &[owner.as_bytes(), key.as_bytes(), &revision.to_be_bytes()],
        )
    }

    fn encode(kind: KeyKind, fields: &[&[u8]]) -> Self {
        let len = 1 + fields.iter().map(|f| 4 + f.len()).sum::<usize>();
        let mut buf = Vec::with_capacity(len);
        buf.push(kind.tag());
        for field in fields {
            // Variable-length fields are capped at MAX_FIELD_LEN on construction.
            debug_assert!(field.len() <= MAX_FIELD_LEN);
            buf.extend_from_slice(&(field.len() as u32).to_be_bytes());
            buf.extend_from_slice(field);
        }
        Self(buf)
    }

    pub fn kind(&self) -> KeyKind {
        // Constructors always write a known tag first.
        KeyKind::from_tag(self.0[0]).unwrap_or(KeyKind::Record)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({:?}, {})", self.kind(), hex::encode(&self.0))
    }
}
