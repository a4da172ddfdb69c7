//! The user registry: public key to [`User`] entity.

use nigori_store::Session;
use nigori_types::{PublicKey, StorageKey, User};

use crate::entity::{decode, encode};
use crate::error::EngineResult;

/// Maps public keys to registered users.
///
/// The registry owns every `User` entity. All methods run inside a caller's
/// session, so a check followed by an insert in the same session commits
/// atomically or not at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct UserRegistry;

impl UserRegistry {
    pub fn find(&self, session: &mut dyn Session, public_key: &PublicKey) -> EngineResult<Option<User>> {
        let key = StorageKey::user(public_key);
        match session.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, session: &mut dyn Session, public_key: &PublicKey) -> EngineResult<bool> {
        let key = StorageKey::user(public_key);
        Ok(session.get(key.as_bytes())?.is_some())
    }

    /// Insert `user` unless its public key is already registered.
    ///
    /// Returns `false` and writes nothing if the key is taken.
    pub fn insert_if_absent(&self, session: &mut dyn Session, user: &User) -> EngineResult<bool> {
        if self.exists(session, user.public_key())? {
            return Ok(false);
        }
        let key = StorageKey::user(user.public_key());
        session.put(key.as_bytes(), encode(user)?)?;
        Ok(true)
    }

    /// Remove the user registered under `public_key`.
    ///
    /// Returns whether a user was present.
    pub fn remove(&self, session: &mut dyn Session, public_key: &PublicKey) -> EngineResult<bool> {
        let existed = self.exists(session, public_key)?;
        if existed {
            session.delete(StorageKey::user(public_key).as_bytes())?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nigori_store::{InMemoryKvStore, KvStore};
    use nigori_types::Timestamp;

    fn pk(s: &str) -> PublicKey {
        PublicKey::new(s.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn insert_then_find() {
        let store = InMemoryKvStore::new();
        let registry = UserRegistry;
        let user = User::new(pk("pk1"), Timestamp::from_millis(10));

        let mut s = store.session().unwrap();
        assert!(registry.insert_if_absent(s.as_mut(), &user).unwrap());
        s.commit().unwrap();

        let mut s = store.session().unwrap();
        assert_eq!(registry.find(s.as_mut(), &pk("pk1")).unwrap(), Some(user));
        assert!(registry.find(s.as_mut(), &pk("pk2")).unwrap().is_none());
    }

    #[test]
    fn second_insert_is_refused() {
        let store = InMemoryKvStore::new();
        let registry = UserRegistry;
        let mut s = store.session().unwrap();
        assert!(registry
            .insert_if_absent(s.as_mut(), &User::new(pk("pk1"), Timestamp::from_millis(1)))
            .unwrap());
        assert!(!registry
            .insert_if_absent(s.as_mut(), &User::new(pk("pk1"), Timestamp::from_millis(2)))
            .unwrap());
        s.commit().unwrap();

        let mut s = store.session().unwrap();
        let kept = registry.find(s.as_mut(), &pk("pk1")).unwrap().unwrap();
        assert_eq!(kept.registered_at(), Timestamp::from_millis(1));
    }

    #[test]
    fn remove_reports_presence() {
        let store = InMemoryKvStore::new();
        let registry = UserRegistry;
        let mut s = store.session().unwrap();
        registry
            .insert_if_absent(s.as_mut(), &User::new(pk("pk1"), Timestamp::now()))
            .unwrap();
        assert!(registry.remove(s.as_mut(), &pk("pk1")).unwrap());
        assert!(!registry.remove(s.as_mut(), &pk("pk1")).unwrap());
        assert!(!registry.exists(s.as_mut(), &pk("pk1")).unwrap());
    }
}
