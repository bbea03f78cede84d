//! Atomic file writes for the project record and vendored assets.
//!
//! Every write goes to a sibling temp file, is synced to disk, then renamed
//! over the target. A crash at any point leaves either the old file or the
//! new one, never a torn mix.

use crate::config::LibraryConfig;
use crate::{Result, VendorError};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, warn};

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(VendorError::io_with_path(e, path)),
    };

    let data: T = serde_json::from_str(&contents).map_err(|e| VendorError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Serialize `data` as pretty JSON and write it atomically.
///
/// With `keep_backup`, the previous file is copied to `<name>.bak` first.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T, keep_backup: bool) -> Result<()> {
    let serialized = serde_json::to_vec_pretty(data).map_err(|e| VendorError::Json {
        message: format!("Failed to serialize {}: {}", path.display(), e),
        source: Some(e),
    })?;

    if keep_backup && path.exists() {
        let backup_path = sibling_with_suffix(path, LibraryConfig::BACKUP_SUFFIX);
        match fs::copy(path, &backup_path) {
            Ok(_) => debug!("Created backup: {}", backup_path.display()),
            Err(e) => warn!("Failed to create backup {}: {}", backup_path.display(), e),
        }
    }

    atomic_write_bytes(path, &serialized)
}

/// Write raw bytes to `path` atomically, creating parent directories.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| VendorError::io_with_path(e, parent))?;
    }

    let temp_path = sibling_with_suffix(
        path,
        &format!(".{}{}", process::id(), LibraryConfig::DOWNLOAD_TEMP_SUFFIX),
    );

    let written = write_and_sync(&temp_path, bytes);
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        VendorError::io_with_path(e, path)
    })?;

    debug!("Atomically wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn write_and_sync(temp_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| VendorError::io_with_path(e, temp_path))?;

    file.write_all(bytes)
        .map_err(|e| VendorError::io_with_path(e, temp_path))?;
    file.sync_all()
        .map_err(|e| VendorError::io_with_path(e, temp_path))?;
    Ok(())
}

/// `dir/name.ext` -> `dir/name.ext<suffix>`
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
