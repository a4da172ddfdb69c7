//! The storage engine facade.
//!
//! [`StorageEngine`] composes the [`UserRegistry`], [`LookupIndex`] and
//! [`RecordStore`] into the [`Database`] contract. Every public operation
//! runs as one substrate session:
//!
//! 1. Open a session (released on drop, so every exit path releases it).
//! 2. Read what the operation depends on; the session tracks those reads.
//! 3. Write records first, then publish them by advancing the lookup.
//! 4. Commit. A commit conflict means another caller changed something this
//!    operation read; the whole unit is re-run from step 1, up to
//!    [`EngineConfig::max_commit_retries`] times.

use std::sync::Arc;

use nigori_store::{KvStore, Session};
use nigori_types::{PublicKey, RecordKey, Revision, Timestamp, TypeError, User};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, RetentionPolicy};
use crate::error::{EngineError, EngineResult};
use crate::lookup::{Lookup, LookupIndex};
use crate::records::RecordStore;
use crate::registry::UserRegistry;
use crate::traits::Database;

pub struct StorageEngine {
    store: Arc<dyn KvStore>,
    config: EngineConfig,
    registry: UserRegistry,
    lookups: LookupIndex,
    records: RecordStore,
}

impl StorageEngine {
    /// Create an engine over `store` with the default configuration.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            registry: UserRegistry,
            lookups: LookupIndex,
            records: RecordStore,
        }
    }

    pub fn with_config(store: Arc<dyn KvStore>, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(store)
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The live revision of `key`, or `None` if it has none.
    pub fn current_revision(&self, user: &User, key: &[u8]) -> EngineResult<Option<Revision>> {
        let key = self.record_key(key)?;
        let owner = user.id();
        self.transact("current_revision", |s| {
            Ok(self
                .lookups
                .find(s, &owner, &key)?
                .map(|lookup| lookup.current_revision()))
        })
    }

    /// Every readable revision of `key`, ascending, current last.
    ///
    /// Under [`RetentionPolicy::CurrentOnly`] this is at most one revision.
    pub fn revisions(&self, user: &User, key: &[u8]) -> EngineResult<Vec<Revision>> {
        let key = self.record_key(key)?;
        let owner = user.id();
        self.transact("revisions", |s| {
            Ok(self
                .lookups
                .find(s, &owner, &key)?
                .map(|lookup| lookup.revisions())
                .unwrap_or_default())
        })
    }

    /// Read `key` as of `revision`, if that revision is still retained.
    pub fn get_record_at(
        &self,
        user: &User,
        key: &[u8],
        revision: Revision,
    ) -> EngineResult<Option<Vec<u8>>> {
        let key = self.record_key(key)?;
        let owner = user.id();
        self.transact("get_record_at", |s| {
            match self.lookups.find(s, &owner, &key)? {
                Some(lookup) if lookup.holds(revision) => {
                    self.records.get(s, &owner, &key, revision)
                }
                _ => Ok(None),
            }
        })
    }

    /// Write `value` as the next revision of `key` and return that revision.
    ///
    /// The write is unconditional, but it still reads the lookup it advances,
    /// so heavy contention on one key can exhaust
    /// [`EngineConfig::max_commit_retries`] and surface as
    /// [`EngineError::StorageFailure`] wrapping a commit conflict.
    pub fn write_record(&self, user: &User, key: &[u8], value: &[u8]) -> EngineResult<Revision> {
        let key = self.record_key(key)?;
        self.check_value(value)?;
        let owner = user.id();

        let revision = self.transact("put_record", |s| {
            self.ensure_registered(s, user)?;
            match self.lookups.find(s, &owner, &key)? {
                None => {
                    self.records.put(s, &owner, &key, Revision::INITIAL, value)?;
                    self.lookups.create(s, &owner, &key, Revision::INITIAL)?;
                    Ok(Revision::INITIAL)
                }
                Some(mut lookup) => {
                    let next = lookup.current_revision().next().ok_or_else(|| {
                        EngineError::InvalidArgument(format!("revision space exhausted for {key:?}"))
                    })?;
                    self.records.put(s, &owner, &key, next, value)?;
                    self.publish(s, &mut lookup, next)?;
                    Ok(next)
                }
            }
        })?;
        debug!(user = %owner, ?key, %revision, "record written");
        Ok(revision)
    }

    /// Conditional write that reports why it did not apply.
    ///
    /// Returns the published revision, or [`EngineError::ConflictRejected`]
    /// if `key` has no live revision or `expected` is not it.
    pub fn try_update_record(
        &self,
        user: &User,
        key: &[u8],
        value: &[u8],
        expected: Revision,
        new_revision: Revision,
    ) -> EngineResult<Revision> {
        let key = self.record_key(key)?;
        self.check_value(value)?;
        if !new_revision.succeeds(&expected) {
            return Err(EngineError::InvalidArgument(format!(
                "new revision {new_revision} must be greater than expected {expected}"
            )));
        }
        let owner = user.id();

        self.transact("update_record", |s| {
            self.ensure_registered(s, user)?;
            let mut lookup = match self.lookups.find(s, &owner, &key)? {
                Some(lookup) if lookup.current_revision() == expected => lookup,
                found => {
                    return Err(EngineError::ConflictRejected {
                        expected,
                        actual: found.map(|l| l.current_revision()),
                    })
                }
            };
            self.records.put(s, &owner, &key, new_revision, value)?;
            self.publish(s, &mut lookup, new_revision)?;
            Ok(new_revision)
        })
        .inspect(|revision| debug!(user = %owner, ?key, %revision, "record updated"))
    }

    /// Run `unit` in a fresh session and commit it, retrying on conflict.
    fn transact<T, F>(&self, op: &'static str, mut unit: F) -> EngineResult<T>
    where
        F: FnMut(&mut dyn Session) -> EngineResult<T>,
    {
        let mut attempt = 0u32;
        loop {
            let mut session = self.store.session()?;
            let output = unit(session.as_mut())?;
            match session.commit() {
                Ok(()) => return Ok(output),
                Err(e) if e.is_conflict() && attempt < self.config.max_commit_retries => {
                    attempt += 1;
                    debug!(op, attempt, "commit conflict, retrying");
                }
                Err(e) => {
                    if e.is_conflict() {
                        warn!(op, attempt, "commit retries exhausted");
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Point `lookup` at `revision` and apply the retention policy to the
    /// revision it replaces. The record at `revision` must already be written.
    fn publish(&self, session: &mut dyn Session, lookup: &mut Lookup, revision: Revision) -> EngineResult<()> {
        let retain = self.config.retention == RetentionPolicy::KeepAll;
        let superseded = self.lookups.advance(session, lookup, revision, retain)?;
        if !retain {
            self.records
                .delete(session, lookup.owner(), lookup.key(), superseded)?;
        }
        Ok(())
    }

    fn ensure_registered(&self, session: &mut dyn Session, user: &User) -> EngineResult<()> {
        if self.registry.exists(session, user.public_key())? {
            Ok(())
        } else {
            Err(EngineError::UserNotFound { user: user.id() })
        }
    }

    fn public_key(&self, bytes: &[u8]) -> EngineResult<PublicKey> {
        if bytes.len() > self.config.max_public_key_len {
            return Err(TypeError::TooLong {
                field: "public key",
                len: bytes.len(),
                max: self.config.max_public_key_len,
            }
            .into());
        }
        Ok(PublicKey::new(bytes)?)
    }

    fn record_key(&self, bytes: &[u8]) -> EngineResult<RecordKey> {
        if bytes.len() > self.config.max_key_len {
            return Err(TypeError::TooLong {
                field: "record key",
                len: bytes.len(),
                max: self.config.max_key_len,
            }
            .into());
        }
        Ok(RecordKey::new(bytes)?)
    }

    fn check_value(&self, value: &[u8]) -> EngineResult<()> {
        if value.len() > self.config.max_value_len {
            return Err(TypeError::TooLong {
                field: "value",
                len: value.len(),
                max: self.config.max_value_len,
            }
            .into());
        }
        Ok(())
    }
}

impl Database for StorageEngine {
    fn have_user(&self, public_key: &[u8]) -> EngineResult<bool> {
        let public_key = self.public_key(public_key)?;
        self.transact("have_user", |s| self.registry.exists(s, &public_key))
    }

    fn add_user(&self, public_key: &[u8]) -> EngineResult<bool> {
        let public_key = self.public_key(public_key)?;
        let added = self.transact("add_user", |s| {
            let user = User::new(public_key.clone(), Timestamp::now());
            self.registry.insert_if_absent(s, &user)
        })?;
        if added {
            info!(user = %public_key.user_id(), "user registered");
        }
        Ok(added)
    }

    fn delete_user(&self, user: &User) -> EngineResult<bool> {
        let existed = self.transact("delete_user", |s| self.registry.remove(s, user.public_key()))?;
        info!(user = %user.id(), existed, "user removed");
        Ok(true)
    }

    fn get_user(&self, public_key: &[u8]) -> EngineResult<User> {
        let public_key = self.public_key(public_key)?;
        self.transact("get_user", |s| self.registry.find(s, &public_key))?
            .ok_or(EngineError::UserNotFound {
                user: public_key.user_id(),
            })
    }

    fn get_record(&self, user: &User, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let key = self.record_key(key)?;
        let owner = user.id();
        self.transact("get_record", |s| {
            let Some(lookup) = self.lookups.find(s, &owner, &key)? else {
                return Ok(None);
            };
            let revision = lookup.current_revision();
            let value = self.records.get(s, &owner, &key, revision)?;
            if value.is_none() {
                warn!(user = %owner, ?key, %revision, "lookup points at a missing record");
            }
            Ok(value)
        })
    }

    fn put_record(&self, user: &User, key: &[u8], value: &[u8]) -> EngineResult<bool> {
        self.write_record(user, key, value).map(|_| true)
    }

    fn update_record(
        &self,
        user: &User,
        key: &[u8],
        value: &[u8],
        expected: Revision,
        new_revision: Revision,
    ) -> EngineResult<bool> {
        match self.try_update_record(user, key, value, expected, new_revision) {
            Ok(_) => Ok(true),
            Err(EngineError::ConflictRejected { expected, actual }) => {
                debug!(%expected, ?actual, "conditional update rejected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn delete_record(&self, user: &User, key: &[u8]) -> EngineResult<bool> {
        let key = self.record_key(key)?;
        let owner = user.id();
        // The lookup removal commits even when clearing its records fails;
        // the record error is reported only after that commit.
        let cleared = self.transact("delete_record", |s| {
            let Some(lookup) = self.lookups.find(s, &owner, &key)? else {
                return Ok(None);
            };
            let cleared = self.records.delete_lineage(s, &lookup);
            self.lookups.remove(s, &owner, &key)?;
            Ok(Some(cleared))
        })?;
        match cleared {
            None => Ok(false),
            Some(Ok(())) => {
                debug!(user = %owner, ?key, "record deleted");
                Ok(true)
            }
            Some(Err(e)) => {
                warn!(user = %owner, ?key, error = %e, "lookup removed but records left behind");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
