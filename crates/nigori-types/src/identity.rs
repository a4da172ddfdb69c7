use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::check_field_len;
use crate::temporal::Timestamp;

/// A user's public key, as presented by the transport layer.
///
/// The store never interprets the key material; signature verification
/// happens before a request reaches the engine. The only structural rule is
/// that a public key is non-empty.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Wrap raw key bytes, rejecting an empty key.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, TypeError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TypeError::Empty {
                field: "public key",
            });
        }
        check_field_len("public key", bytes.len())?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// The namespace identifier derived from this key.
    pub fn user_id(&self) -> UserId {
        UserId::derive(self)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = &self.0[..self.0.len().min(4)];
        write!(f, "PublicKey({}.., {} bytes)", hex::encode(prefix), self.0.len())
    }
}

/// Fixed-size namespace identifier derived from a [`PublicKey`].
///
/// Public keys have no length bound, so storage keys are built from this
/// 32-byte BLAKE3 digest instead. The same public key always produces the
/// same `UserId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId([u8; 32]);

impl UserId {
    pub fn derive(public_key: &PublicKey) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"nigori-user-v1:");
        hasher.update(public_key.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from a raw 32-byte digest. Use `derive()` for production code.
    pub fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("u:{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.short_id())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

/// A registered user: the owner of one record namespace.
///
/// Users are immutable once registered. Removing and re-adding the same
/// public key yields a new `User` with a fresh `registered_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    public_key: PublicKey,
    registered_at: Timestamp,
}

impl User {
    pub fn new(public_key: PublicKey, registered_at: Timestamp) -> Self {
        Self {
            public_key,
            registered_at,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn registered_at(&self) -> Timestamp {
        self.registered_at
    }

    pub fn id(&self) -> UserId {
        self.public_key.user_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_public_key_is_rejected() {
        let err = PublicKey::new(Vec::new()).unwrap_err();
        assert_eq!(err, TypeError::Empty { field: "public key" });
    }

    #[test]
    fn derive_is_deterministic() {
        let pk = PublicKey::new(b"pk1".to_vec()).unwrap();
        assert_eq!(UserId::derive(&pk), UserId::derive(&pk));
    }

    #[test]
    fn different_keys_produce_different_ids() {
        let a = PublicKey::new(b"pk1".to_vec()).unwrap();
        let b = PublicKey::new(b"pk2".to_vec()).unwrap();
        assert_ne!(a.user_id(), b.user_id());
    }

    #[test]
    fn hex_rendering() {
        let pk = PublicKey::new(vec![0xde, 0xad, 0xbe, 0xef]).unwrap();
        assert_eq!(pk.to_hex(), "deadbeef");
        assert_eq!(pk.user_id().to_hex().len(), 64);
    }

    #[test]
    fn short_id_format() {
        let id = UserId::from_raw([0xab; 32]);
        assert_eq!(id.short_id(), "u:abababab");
    }

    #[test]
    fn user_id_follows_public_key() {
        let pk = PublicKey::new(b"pk1".to_vec()).unwrap();
        let user = User::new(pk.clone(), Timestamp::from_millis(5));
        assert_eq!(user.id(), pk.user_id());
        assert_eq!(user.registered_at(), Timestamp::from_millis(5));
    }

    #[test]
    fn user_serde_roundtrip() {
        let user = User::new(
            PublicKey::new(b"pk1".to_vec()).unwrap(),
            Timestamp::from_millis(42),
        );
        let json = serde_json::to_string(&user).unwrap();
        let parsed: User = serde_json::from_str(&json).unwrap();
        assert_eq!(user, parsed);
    }
}
