//! The lookup index: head pointers from (user, key) to the live revision.
//!
//! A [`Lookup`] is to a record lineage what a branch ref is to a commit
//! chain: a small mutable pointer in front of immutable data. It is written
//! after the record it names and removed together with that record, so a
//! reader that finds a lookup can expect the record behind it to exist.

use serde::{Deserialize, Serialize};

use nigori_store::Session;
use nigori_types::{RecordKey, Revision, StorageKey, UserId};

use crate::entity::{decode, encode};
use crate::error::{EngineError, EngineResult};

/// The head pointer for one (user, key) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookup {
    owner: UserId,
    key: RecordKey,
    current: Revision,
    /// Superseded revisions still held by the record store, ascending.
    retained: Vec<Revision>,
}

impl Lookup {
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn current_revision(&self) -> Revision {
        self.current
    }

    pub fn retained(&self) -> &[Revision] {
        &self.retained
    }

    /// Every readable revision, ascending, current last.
    pub fn revisions(&self) -> Vec<Revision> {
        let mut all = self.retained.clone();
        all.push(self.current);
        all
    }

    pub fn holds(&self, revision: Revision) -> bool {
        self.current == revision || self.retained.binary_search(&revision).is_ok()
    }

    fn storage_key(&self) -> StorageKey {
        StorageKey::lookup(&self.owner, &self.key)
    }
}

/// Owns every [`Lookup`] entity.
#[derive(Clone, Copy, Debug, Default)]
pub struct LookupIndex;

impl LookupIndex {
    pub fn find(
        &self,
        session: &mut dyn Session,
        owner: &UserId,
        key: &RecordKey,
    ) -> EngineResult<Option<Lookup>> {
        let storage_key = StorageKey::lookup(owner, key);
        match session.get(storage_key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&storage_key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Create the lookup for a pair that has none yet.
    ///
    /// Fails with [`EngineError::AlreadyExists`] if the pair already has one.
    pub fn create(
        &self,
        session: &mut dyn Session,
        owner: &UserId,
        key: &RecordKey,
        initial: Revision,
    ) -> EngineResult<Lookup> {
        if self.find(session, owner, key)?.is_some() {
            return Err(EngineError::AlreadyExists(format!(
                "lookup for {owner} {key:?}"
            )));
        }
        let lookup = Lookup {
            owner: *owner,
            key: key.clone(),
            current: initial,
            retained: Vec::new(),
        };
        session.put(lookup.storage_key().as_bytes(), encode(&lookup)?)?;
        Ok(lookup)
    }

    /// Point `lookup` at `revision`.
    ///
    /// Must only be called once the record at `revision` has been written in
    /// the same session. When `retain_previous` is set the old current
    /// revision moves to the retained list; otherwise the caller is expected
    /// to remove its record. Returns the superseded revision.
    pub fn advance(
        &self,
        session: &mut dyn Session,
        lookup: &mut Lookup,
        revision: Revision,
        retain_previous: bool,
    ) -> EngineResult<Revision> {
        if !revision.succeeds(&lookup.current) {
            return Err(EngineError::InvalidArgument(format!(
                "revision {revision} does not follow current {}",
                lookup.current
            )));
        }
        let previous = lookup.current;
        if retain_previous {
            lookup.retained.push(previous);
        }
        lookup.current = revision;
        session.put(lookup.storage_key().as_bytes(), encode(&*lookup)?)?;
        Ok(previous)
    }

    pub fn remove(&self, session: &mut dyn Session, owner: &UserId, key: &RecordKey) -> EngineResult<()> {
        session.delete(StorageKey::lookup(owner, key).as_bytes())?;
        Ok(())
    }
}
