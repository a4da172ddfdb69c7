//! Encoding of persisted entities.
//!
//! Entities are stored in the substrate as bincode-serialized structs. A
//! value that fails to decode is corruption in the substrate and surfaces as
//! [`EngineError::StorageFailure`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use nigori_store::StoreError;
use nigori_types::{RecordKey, Revision, StorageKey, UserId};

use crate::error::EngineResult;

/// One immutable value at one revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RecordEntity {
    pub(crate) owner: UserId,
    pub(crate) key: RecordKey,
    pub(crate) revision: Revision,
    pub(crate) value: Vec<u8>,
}

pub(crate) fn encode<T: Serialize>(value: &T) -> EngineResult<Vec<u8>> {
    Ok(bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?)
}

pub(crate) fn decode<T: DeserializeOwned>(key: &StorageKey, bytes: &[u8]) -> EngineResult<T> {
    Ok(bincode::deserialize(bytes)
        .map_err(|e| StoreError::Serialization(format!("{key:?}: {e}")))?)
}
