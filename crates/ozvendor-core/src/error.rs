//! Error types for the vendoring core.
//!
//! Errors fall in two groups: fatal ones that abort a sync attempt before any
//! local state is touched (manifest, version, lock, persistence), and scoped
//! ones that are attached to a single asset and reported individually.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the vendoring library.
#[derive(Debug, Error)]
pub enum VendorError {
    // Remote source errors
    #[error("Manifest unavailable from {url}: {message}")]
    ManifestUnavailable {
        url: String,
        message: String,
        /// Whether another attempt may succeed.
        transient: bool,
    },

    #[error("Failed to fetch {path}: {message}")]
    AssetFetchFailed {
        path: String,
        message: String,
        /// Whether another attempt may succeed.
        transient: bool,
    },

    #[error("Asset not found at source: {path}")]
    AssetNotFound { path: String },

    #[error("Hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    // Version errors
    #[error("Invalid library version: {version}")]
    InvalidVersion { version: String },

    #[error("Refusing to move library from version {installed} back to {offered}")]
    VersionDowngrade { installed: String, offered: String },

    // Local state errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to persist project record {path}: {message}")]
    PersistenceWriteFailed { path: PathBuf, message: String },

    #[error("Library directory is locked by another sync: {0}")]
    LibraryLocked(PathBuf),

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Sync cancelled")]
    Cancelled,
}

/// Result type alias for vendoring operations.
pub type Result<T> = std::result::Result<T, VendorError>;

impl From<std::io::Error> for VendorError {
    fn from(err: std::io::Error) -> Self {
        VendorError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for VendorError {
    fn from(err: serde_json::Error) -> Self {
        VendorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl VendorError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        VendorError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Check if this error should trigger another fetch attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            VendorError::AssetFetchFailed { transient, .. }
            | VendorError::ManifestUnavailable { transient, .. } => *transient,
            VendorError::Network { .. } | VendorError::Timeout(_) => true,
            _ => false,
        }
    }
}
