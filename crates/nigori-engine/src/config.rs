use std::path::Path;

use serde::{Deserialize, Serialize};

use nigori_types::MAX_FIELD_LEN;

use crate::error::{EngineError, EngineResult};

/// What happens to a record once a newer revision of it is published.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetentionPolicy {
    /// Remove the superseded record in the same transaction that publishes
    /// its successor. Only the current revision is ever readable.
    #[default]
    CurrentOnly,
    /// Keep every revision until the key is deleted.
    KeepAll,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retention: RetentionPolicy,
    /// How many times a unit of work is re-run after a commit conflict.
    pub max_commit_retries: u32,
    pub max_public_key_len: usize,
    pub max_key_len: usize,
    pub max_value_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::CurrentOnly,
            max_commit_retries: 16,
            max_public_key_len: 4096,
            max_key_len: 1024,
            max_value_len: 1024 * 1024,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (name, limit) in [
            ("max_public_key_len", self.max_public_key_len),
            ("max_key_len", self.max_key_len),
        ] {
            if limit == 0 {
                return Err(EngineError::Config(format!("{name} must be positive")));
            }
            if limit > MAX_FIELD_LEN {
                return Err(EngineError::Config(format!(
                    "{name} must not exceed {MAX_FIELD_LEN}"
                )));
            }
        }
        if self.max_value_len == 0 {
            return Err(EngineError::Config("max_value_len must be positive".into()));
        }
        Ok(())
    }
}
