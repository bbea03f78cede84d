//! Persisted record of what was last installed.

use crate::error::{Result, VendorError};
use crate::metadata::{atomic_read_json, atomic_write_json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Contents of `project.json`.
///
/// `installed` maps each asset's relative path to the hash it had when it
/// was written. An empty `version` means nothing was ever installed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRecord {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub installed: BTreeMap<String, String>,
}

impl LocalRecord {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            installed: BTreeMap::new(),
        }
    }

    /// True before the first successful sync.
    pub fn is_empty(&self) -> bool {
        self.version.is_empty() && self.installed.is_empty()
    }

    pub fn recorded_hash(&self, relative_path: &str) -> Option<&str> {
        self.installed.get(relative_path).map(String::as_str)
    }

    pub fn record(&mut self, relative_path: impl Into<String>, hash: impl Into<String>) {
        self.installed.insert(relative_path.into(), hash.into());
    }
}

/// Loads and saves the [`LocalRecord`] of one library directory.
#[derive(Debug, Clone)]
pub struct ProjectStateStore {
    path: PathBuf,
}

impl ProjectStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record. A missing file is a first run, not an error.
    pub fn load(&self) -> Result<LocalRecord> {
        match atomic_read_json::<LocalRecord>(&self.path)? {
            Some(record) => {
                debug!(
                    "Loaded project record {} (version {}, {} files)",
                    self.path.display(),
                    record.version,
                    record.installed.len()
                );
                Ok(record)
            }
            None => {
                debug!("No project record at {}, starting empty", self.path.display());
                Ok(LocalRecord::default())
            }
        }
    }

    /// Save the record atomically, retrying once before giving up.
    pub fn save(&self, record: &LocalRecord) -> Result<()> {
        if let Err(first) = atomic_write_json(&self.path, record, true) {
            warn!(
                "Writing {} failed ({}), retrying once",
                self.path.display(),
                first
            );
            atomic_write_json(&self.path, record, true).map_err(|e| {
                VendorError::PersistenceWriteFailed {
                    path: self.path.clone(),
                    message: e.to_string(),
                }
            })?;
        }
        Ok(())
    }
}
