//! Centralized configuration for the vendoring core.
//!
//! Constant holders carry the fixed names and defaults; [`SyncConfig`] is the
//! value a caller builds (or loads from a settings file) and hands to the
//! [`SyncController`](crate::SyncController).

use crate::error::{Result, VendorError};
use crate::hashing::HashAlgorithm;
use crate::metadata::atomic_read_json;
use crate::network::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const USER_AGENT: &'static str = "ozvendor/0.1";
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_DELAY: Duration = Duration::from_millis(500);
    pub const DEFAULT_CONCURRENCY: usize = 4;
    pub const MANIFEST_FILE_NAME: &'static str = "manifest.json";
}

/// Names and defaults of the vendored library on disk.
pub struct LibraryConfig;

impl LibraryConfig {
    pub const PROJECT_FILE_NAME: &'static str = "project.json";
    pub const LOCK_FILE_NAME: &'static str = ".ozvendor.lock";
    pub const BACKUP_SUFFIX: &'static str = ".bak";
    pub const DOWNLOAD_TEMP_SUFFIX: &'static str = ".part";
    pub const MAX_REHASHES: u32 = 3;
    pub const DEFAULT_LIBRARY_DIR: &'static str = "contracts/openzeppelin";
    pub const DEFAULT_SOURCE_URL: &'static str =
        "https://raw.githubusercontent.com/OpenZeppelin/openzeppelin-contracts-manifest/master";
    pub const KNOWN_VERSIONS: &'static [&'static str] = &["2.3.0", "2.4.0"];
}

/// Options for one sync controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Directory the library is vendored into; `project.json` lives here.
    pub library_dir: PathBuf,
    /// Base URL of the remote distribution.
    pub source_url: String,
    /// Pinned library version. `None` targets the latest one.
    pub version: Option<String>,
    /// Categories to install. Empty selects every category.
    pub categories: Vec<String>,
    /// Number of assets fetched at the same time.
    pub concurrency: usize,
    /// Fetch attempts per asset, including the first one.
    pub retry_attempts: u32,
    /// Fixed delay between fetch attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Times one conflicting file may be hashed again when the conflict
    /// policy answers `Retry`. Independent of the fetch attempts above.
    pub rehash_attempts: u32,
    pub hash_algorithm: HashAlgorithm,
    /// Versions a pin may name. Empty disables the local check.
    pub known_versions: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            library_dir: PathBuf::from(LibraryConfig::DEFAULT_LIBRARY_DIR),
            source_url: LibraryConfig::DEFAULT_SOURCE_URL.to_string(),
            version: None,
            categories: Vec::new(),
            concurrency: NetworkConfig::DEFAULT_CONCURRENCY,
            retry_attempts: NetworkConfig::MAX_RETRIES,
            retry_delay_ms: NetworkConfig::RETRY_DELAY.as_millis() as u64,
            rehash_attempts: LibraryConfig::MAX_REHASHES,
            hash_algorithm: HashAlgorithm::default(),
            known_versions: LibraryConfig::KNOWN_VERSIONS
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

impl SyncConfig {
    /// Create a config for the given library directory with default values.
    pub fn new(library_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
            ..Self::default()
        }
    }

    /// Load a config from a JSON settings file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(atomic_read_json::<Self>(path)?.unwrap_or_default())
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_rehash_attempts(mut self, attempts: u32) -> Self {
        self.rehash_attempts = attempts;
        self
    }

    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    pub fn with_known_versions(mut self, versions: Vec<String>) -> Self {
        self.known_versions = versions;
        self
    }

    /// Path of the persisted project record.
    pub fn project_file(&self) -> PathBuf {
        self.library_dir.join(LibraryConfig::PROJECT_FILE_NAME)
    }

    /// Path of the lock file serializing syncs of this library.
    pub fn lock_file(&self) -> PathBuf {
        self.library_dir.join(LibraryConfig::LOCK_FILE_NAME)
    }

    /// Retry behavior for manifest and asset fetches.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::fixed(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    /// Reject values no sync could run with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(VendorError::Config {
                message: "concurrency must be at least 1".to_string(),
            });
        }
        if self.retry_attempts == 0 {
            return Err(VendorError::Config {
                message: "retry attempts must be at least 1".to_string(),
            });
        }
        Url::parse(&self.source_url).map_err(|e| VendorError::Config {
            message: format!("invalid source url {}: {}", self.source_url, e),
        })?;
        Ok(())
    }

    /// Check the version pin against the known versions list.
    ///
    /// Runs before any network access.
    pub fn check_version_pin(&self) -> Result<()> {
        match &self.version {
            Some(pin) if !self.known_versions.is_empty() && !self.known_versions.contains(pin) => {
                Err(VendorError::InvalidVersion {
                    version: pin.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
