//! The record store: immutable values addressed by (user, key, revision).

use nigori_store::{Session, StoreError};
use nigori_types::{RecordKey, Revision, StorageKey, UserId};
use tracing::{debug, warn};

use crate::entity::{decode, encode, RecordEntity};
use crate::error::EngineResult;
use crate::lookup::Lookup;

/// Owns every record value.
///
/// Writing a new value always means minting a new revision first, so the
/// engine never writes a triple its lookup still refers to.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordStore;

impl RecordStore {
    pub fn get(
        &self,
        session: &mut dyn Session,
        owner: &UserId,
        key: &RecordKey,
        revision: Revision,
    ) -> EngineResult<Option<Vec<u8>>> {
        let storage_key = StorageKey::record(owner, key, revision);
        let Some(bytes) = session.get(storage_key.as_bytes())? else {
            return Ok(None);
        };
        let entity: RecordEntity = decode(&storage_key, &bytes)?;
        if entity.revision != revision || entity.owner != *owner || entity.key != *key {
            return Err(StoreError::Serialization(format!(
                "{storage_key:?}: entity identity does not match its key"
            ))
            .into());
        }
        Ok(Some(entity.value))
    }

    /// Store `value` at a triple no lookup refers to.
    ///
    /// A value already stored there is an orphan from a delete whose record
    /// removal failed, and is replaced.
    pub fn put(
        &self,
        session: &mut dyn Session,
        owner: &UserId,
        key: &RecordKey,
        revision: Revision,
        value: &[u8],
    ) -> EngineResult<()> {
        let storage_key = StorageKey::record(owner, key, revision);
        if session.get(storage_key.as_bytes())?.is_some() {
            warn!(user = %owner, ?key, %revision, "replacing orphaned record");
        }
        let entity = RecordEntity {
            owner: *owner,
            key: key.clone(),
            revision,
            value: value.to_vec(),
        };
        session.put(storage_key.as_bytes(), encode(&entity)?)?;
        Ok(())
    }

    pub fn delete(
        &self,
        session: &mut dyn Session,
        owner: &UserId,
        key: &RecordKey,
        revision: Revision,
    ) -> EngineResult<()> {
        session.delete(StorageKey::record(owner, key, revision).as_bytes())?;
        Ok(())
    }

    /// Delete every revision `lookup` knows about, current first.
    ///
    /// Missing records are tolerated; every deletion is attempted even if an
    /// earlier one fails, and the first failure is returned.
    pub fn delete_lineage(&self, session: &mut dyn Session, lookup: &Lookup) -> EngineResult<()> {
        let mut first_error = None;
        let current = std::iter::once(lookup.current_revision());
        for revision in current.chain(lookup.retained().iter().rev().copied()) {
            if let Err(e) = self.delete(session, lookup.owner(), lookup.key(), revision) {
                debug!(%revision, error = %e, "record deletion failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupIndex;
    use nigori_store::{InMemoryKvStore, KvStore};

    fn owner() -> UserId {
        UserId::from_raw([4; 32])
    }

    fn key(s: &str) -> RecordKey {
        RecordKey::new(s.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn put_then_get() {
        let store = InMemoryKvStore::new();
        let mut s = store.session().unwrap();
        RecordStore
            .put(s.as_mut(), &owner(), &key("k"), Revision::INITIAL, b"v0")
            .unwrap();
        s.commit().unwrap();

        let mut s = store.session().unwrap();
        let value = RecordStore
            .get(s.as_mut(), &owner(), &key("k"), Revision::INITIAL)
            .unwrap();
        assert_eq!(value, Some(b"v0".to_vec()));
        assert!(RecordStore
            .get(s.as_mut(), &owner(), &key("k"), Revision::new(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn orphaned_triple_is_replaced() {
        let store = InMemoryKvStore::new();
        let mut s = store.session().unwrap();
        RecordStore
            .put(s.as_mut(), &owner(), &key("k"), Revision::INITIAL, b"orphan")
            .unwrap();
        s.commit().unwrap();

        let mut s = store.session().unwrap();
        RecordStore
            .put(s.as_mut(), &owner(), &key("k"), Revision::INITIAL, b"v0")
            .unwrap();
        let value = RecordStore
            .get(s.as_mut(), &owner(), &key("k"), Revision::INITIAL)
            .unwrap();
        assert_eq!(value, Some(b"v0".to_vec()));
    }

    #[test]
    fn owners_do_not_share_records() {
        let store = InMemoryKvStore::new();
        let other = UserId::from_raw([5; 32]);
        let mut s = store.session().unwrap();
        RecordStore
            .put(s.as_mut(), &owner(), &key("k"), Revision::INITIAL, b"mine")
            .unwrap();
        assert!(RecordStore
            .get(s.as_mut(), &other, &key("k"), Revision::INITIAL)
            .unwrap()
            .is_none());
    }

    #[test]
    fn delete_lineage_removes_all_revisions() {
        let store = InMemoryKvStore::new();
        let mut s = store.session().unwrap();
        let mut lookup = LookupIndex
            .create(s.as_mut(), &owner(), &key("k"), Revision::INITIAL)
            .unwrap();
        RecordStore
            .put(s.as_mut(), &owner(), &key("k"), Revision::INITIAL, b"v0")
            .unwrap();
        RecordStore
            .put(s.as_mut(), &owner(), &key("k"), Revision::new(1), b"v1")
            .unwrap();
        LookupIndex
            .advance(s.as_mut(), &mut lookup, Revision::new(1), true)
            .unwrap();
        s.commit().unwrap();

        let mut s = store.session().unwrap();
        RecordStore.delete_lineage(s.as_mut(), &lookup).unwrap();
        LookupIndex.remove(s.as_mut(), &owner(), &key("k")).unwrap();
        s.commit().unwrap();

        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn delete_lineage_tolerates_missing_records() {
        let store = InMemoryKvStore::new();
        let mut s = store.session().unwrap();
        let lookup = LookupIndex
            .create(s.as_mut(), &owner(), &key("dangling"), Revision::INITIAL)
            .unwrap();
        RecordStore.delete_lineage(s.as_mut(), &lookup).unwrap();
    }
}
