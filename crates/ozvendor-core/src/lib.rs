//! OZ Vendor Core - Headless library for vendoring the OpenZeppelin contracts.
//!
//! This crate keeps a local copy of the contract library in sync with a
//! remote distribution. It can be used programmatically without any CLI or
//! UI; conflicts the core will not decide alone are handed to a
//! [`ConflictPolicy`] supplied by the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use ozvendor_core::{CancellationToken, StaticPolicy, SyncConfig, SyncController};
//!
//! #[tokio::main]
//! async fn main() -> ozvendor_core::Result<()> {
//!     let config = SyncConfig::new("contracts/openzeppelin");
//!     let controller = SyncController::from_config(config)?;
//!
//!     let report = controller
//!         .sync(&StaticPolicy::accept_upgrades(), &CancellationToken::new())
//!         .await?;
//!     println!("{} files downloaded", report.downloaded.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod hashing;
pub mod manifest;
pub mod metadata;
pub mod network;
pub mod sync;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use cancel::{CancellationToken, CancelledError};
pub use config::{LibraryConfig, NetworkConfig, SyncConfig};
pub use error::{Result, VendorError};
pub use hashing::{ContentHasher, HashAlgorithm};
pub use manifest::{compare_versions, Asset, Category, CategorySummary, Manifest, ManifestProvider};
pub use metadata::{LocalRecord, ProjectStateStore};
pub use network::HttpManifestProvider;
pub use sync::{
    AssetClassification, ClassifiedAsset, ConflictPolicy, InvalidReason, Resolution,
    StaticPolicy, StatusReport, SyncController, SyncPhase, SyncReport,
};
