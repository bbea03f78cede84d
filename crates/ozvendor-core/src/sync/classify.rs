//! Classification of manifest assets against the local copy.
//!
//! Local integrity is judged before upstream staleness: a file that was
//! edited since the last sync is `Invalid` even when a newer upstream
//! version exists.

use crate::error::{Result, VendorError};
use crate::hashing::ContentHasher;
use crate::manifest::{Asset, Manifest};
use crate::metadata::LocalRecord;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Why an existing file cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum InvalidReason {
    /// The file exists but was never recorded as installed.
    UnknownProvenance,
    /// The file no longer hashes to the recorded value.
    Modified {
        recorded: String,
        #[serde(rename = "onDisk")]
        on_disk: String,
    },
    /// The file could not be read.
    Unreadable { message: String },
}

/// State of one asset relative to the local copy and the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AssetClassification {
    /// No file and no record entry.
    Missing,
    /// File hash, recorded hash and manifest hash all agree.
    UpToDate,
    /// The record lists the file but it was removed from disk.
    ModifiedLocally,
    /// The file exists but does not match what was recorded.
    Invalid(InvalidReason),
    /// The file matches the record, the manifest offers other content.
    OutOfDate {
        #[serde(rename = "localHash")]
        local_hash: String,
    },
}

impl AssetClassification {
    pub fn is_invalid(&self) -> bool {
        matches!(self, AssetClassification::Invalid(_))
    }

    /// Short name of the state, as used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            AssetClassification::Missing => "missing",
            AssetClassification::UpToDate => "upToDate",
            AssetClassification::ModifiedLocally => "modifiedLocally",
            AssetClassification::Invalid(_) => "invalid",
            AssetClassification::OutOfDate { .. } => "outOfDate",
        }
    }
}

/// An asset paired with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedAsset {
    pub asset: Asset,
    pub classification: AssetClassification,
}

/// Read access to the files of a library directory.
pub trait FileProbe {
    /// Whether a file is present. Errors when presence cannot be determined.
    fn exists(&self, relative_path: &str) -> Result<bool>;
    fn hash(&self, relative_path: &str) -> Result<String>;
}

/// [`FileProbe`] over a directory on disk.
#[derive(Debug, Clone)]
pub struct DiskProbe {
    root: PathBuf,
    hasher: ContentHasher,
}

impl DiskProbe {
    pub fn new(root: impl Into<PathBuf>, hasher: ContentHasher) -> Self {
        Self {
            root: root.into(),
            hasher,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileProbe for DiskProbe {
    fn exists(&self, relative_path: &str) -> Result<bool> {
        let path = self.root.join(relative_path);
        path.try_exists().map_err(|e| VendorError::io_with_path(e, &path))
    }

    fn hash(&self, relative_path: &str) -> Result<String> {
        self.hasher.hash_file(self.root.join(relative_path))
    }
}

/// Classify every asset of `manifest`, in manifest order.
pub fn classify(
    manifest: &Manifest,
    record: &LocalRecord,
    probe: &dyn FileProbe,
) -> Vec<ClassifiedAsset> {
    manifest
        .assets()
        .map(|asset| ClassifiedAsset {
            asset: asset.clone(),
            classification: classify_asset(asset, record, probe),
        })
        .collect()
}

/// Classify one asset.
pub fn classify_asset(
    asset: &Asset,
    record: &LocalRecord,
    probe: &dyn FileProbe,
) -> AssetClassification {
    let recorded = record.recorded_hash(&asset.path);

    let exists = match probe.exists(&asset.path) {
        Ok(exists) => exists,
        Err(e) => {
            debug!("Checking {} failed: {}", asset.path, e);
            return AssetClassification::Invalid(InvalidReason::Unreadable {
                message: e.to_string(),
            });
        }
    };

    if !exists {
        return match recorded {
            Some(_) => AssetClassification::ModifiedLocally,
            None => AssetClassification::Missing,
        };
    }

    let on_disk = match probe.hash(&asset.path) {
        Ok(hash) => hash,
        Err(e) => {
            debug!("Hashing {} failed: {}", asset.path, e);
            return AssetClassification::Invalid(InvalidReason::Unreadable {
                message: e.to_string(),
            });
        }
    };

    let Some(recorded) = recorded else {
        return AssetClassification::Invalid(InvalidReason::UnknownProvenance);
    };

    if on_disk != recorded {
        return AssetClassification::Invalid(InvalidReason::Modified {
            recorded: recorded.to_string(),
            on_disk,
        });
    }

    if asset.hash != on_disk {
        return AssetClassification::OutOfDate {
            local_hash: on_disk,
        };
    }

    AssetClassification::UpToDate
}
