//! Point-in-time snapshots of an [`InMemoryKvStore`].
//!
//! On-disk format:
//! ```text
//! [4 bytes: magic "NGS1"]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized SnapshotFile)]
//! ```
//!
//! Snapshots are written to a temporary file in the target directory and
//! renamed into place, so a reader never observes a half-written snapshot.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::memory::{InMemoryKvStore, StoreState, Versioned};

const MAGIC: &[u8; 4] = b"NGS1";
const HEADER_SIZE: usize = 8;

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl InMemoryKvStore {
    /// Write every committed object to `path`, atomically replacing it.
    pub fn save_snapshot(&self, path: &Path) -> StoreResult<()> {
        let file = {
            let state = self.read_state()?;
            SnapshotFile {
                entries: state
                    .entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.value.clone()))
                    .collect(),
            }
        };
        let payload =
            bincode::serialize(&file).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(MAGIC)?;
        tmp.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
        tmp.write_all(&payload)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

        info!(path = %path.display(), objects = file.entries.len(), "snapshot saved");
        Ok(())
    }

    /// Load a store from a snapshot written by [`save_snapshot`].
    ///
    /// [`save_snapshot`]: InMemoryKvStore::save_snapshot
    pub fn load_snapshot(path: &Path) -> StoreResult<Self> {
        let bytes = fs::read(path)?;
        if bytes.len() < HEADER_SIZE {
            return Err(StoreError::CorruptSnapshot {
                reason: format!("file is {} bytes, shorter than header", bytes.len()),
            });
        }
        let (header, payload) = bytes.split_at(HEADER_SIZE);
        if &header[..4] != MAGIC {
            return Err(StoreError::CorruptSnapshot {
                reason: "bad magic".into(),
            });
        }
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&header[4..]);
        let expected = u32::from_le_bytes(crc_bytes);
        let computed = crc32fast::hash(payload);
        if expected != computed {
            return Err(StoreError::CorruptSnapshot {
                reason: format!("checksum mismatch: expected {expected:#010x}, computed {computed:#010x}"),
            });
        }

        let file: SnapshotFile = bincode::deserialize(payload)
            .map_err(|e| StoreError::CorruptSnapshot { reason: e.to_string() })?;

        let mut state = StoreState::default();
        for (key, value) in file.entries {
            state.clock += 1;
            let version = state.clock;
            state.entries.insert(key, Versioned { version, value });
        }
        debug!(path = %path.display(), objects = state.entries.len(), "snapshot loaded");
        Ok(Self::from_state(state))
    }

    /// Load `path` if it exists, otherwise start with an empty store.
    pub fn open_or_default(path: &Path) -> StoreResult<Self> {
        if path.exists() {
            Self::load_snapshot(path)
        } else {
            Ok(Self::new())
        }
    }
}
