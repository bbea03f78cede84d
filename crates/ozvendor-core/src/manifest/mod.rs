//! Remote catalog of the contract library.
//!
//! A [`Manifest`] is an immutable snapshot fetched once per sync attempt. The
//! [`ManifestProvider`] trait is the seam between the sync logic and the
//! remote distribution; [`HttpManifestProvider`](crate::network::HttpManifestProvider)
//! is the production implementation.

mod types;
mod version;

pub use types::{Asset, Category, CategorySummary, Manifest};
pub use version::compare_versions;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Source of manifests and asset content.
///
/// Implementations must be idempotent: the orchestrator retries
/// `fetch_asset_content` on transient failures.
#[async_trait]
pub trait ManifestProvider: Send + Sync {
    /// Fetch the manifest for `version`, or the latest one when `None`.
    ///
    /// Fails with `ManifestUnavailable` when no usable manifest can be read
    /// and `InvalidVersion` when the source does not serve the pinned version.
    async fn fetch_manifest(&self, version: Option<&str>) -> Result<Manifest>;

    /// Fetch the raw bytes of one asset of the given manifest version.
    async fn fetch_asset_content(&self, version: &str, asset: &Asset) -> Result<Bytes>;
}
