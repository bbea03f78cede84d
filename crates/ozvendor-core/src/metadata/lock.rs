//! Directory-scoped lock so only one sync writes a library at a time.

use crate::error::{Result, VendorError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exclusive advisory lock on a library's lock file.
///
/// Released when dropped.
#[derive(Debug)]
pub struct LibraryLock {
    file: File,
    path: PathBuf,
}

impl LibraryLock {
    /// Take the lock without waiting.
    ///
    /// Returns [`VendorError::LibraryLocked`] if another holder has it.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| VendorError::io_with_path(e, parent))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| VendorError::io_with_path(e, path))?;

        file.try_lock_exclusive()
            .map_err(|_| VendorError::LibraryLocked(path.to_path_buf()))?;

        debug!("Acquired library lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LibraryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!("Released library lock {}", self.path.display());
    }
}
