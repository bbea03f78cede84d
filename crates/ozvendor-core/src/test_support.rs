//! In-memory manifest provider for unit tests.

use crate::error::{Result, VendorError};
use crate::hashing::ContentHasher;
use crate::manifest::{compare_versions, Asset, Category, Manifest, ManifestProvider};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct State {
    manifests: Vec<Manifest>,
    /// (version, path) -> bytes
    content: HashMap<(String, String), Bytes>,
    transient_failures: HashMap<String, u32>,
    delays: HashMap<String, Duration>,
    fetch_counts: HashMap<String, u32>,
    manifest_fetches: u32,
    manifest_down: bool,
    manifest_failures: u32,
}

/// A distribution held in memory, with knobs for injecting failures.
#[derive(Default)]
pub(crate) struct MemoryProvider {
    state: Mutex<State>,
}

impl MemoryProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Publish a version made of `(category, path, bytes)` files. Hashes
    /// are computed with the default hasher.
    pub(crate) fn publish(&self, version: &str, files: &[(&str, &str, &[u8])]) -> Manifest {
        let hasher = ContentHasher::default();
        let mut categories: Vec<Category> = Vec::new();
        let mut state = self.state.lock().unwrap();

        for (category, path, bytes) in files {
            let name = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let asset = Asset::new(*category, name, *path, hasher.hash_bytes(bytes));

            match categories.iter_mut().find(|c| c.name == *category) {
                Some(existing) => existing.assets.push(asset),
                None => categories.push(Category {
                    name: category.to_string(),
                    assets: vec![asset],
                }),
            }
            state.content.insert(
                (version.to_string(), path.to_string()),
                Bytes::copy_from_slice(bytes),
            );
        }

        let manifest = Manifest {
            version: version.to_string(),
            categories,
        };
        state.manifests.retain(|m| m.version != version);
        state.manifests.push(manifest.clone());
        manifest
    }

    pub(crate) fn remove_content(&self, version: &str, path: &str) {
        let mut state = self.state.lock().unwrap();
        state.content.remove(&(version.to_string(), path.to_string()));
    }

    /// Serve bytes that no longer match the published hash.
    pub(crate) fn corrupt_content(&self, version: &str, path: &str, bytes: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.content.insert(
            (version.to_string(), path.to_string()),
            Bytes::copy_from_slice(bytes),
        );
    }

    /// Fail the next `times` fetches of `path` with a transient error.
    pub(crate) fn fail_transiently(&self, path: &str, times: u32) {
        let mut state = self.state.lock().unwrap();
        state.transient_failures.insert(path.to_string(), times);
    }

    pub(crate) fn set_delay(&self, path: &str, delay: Duration) {
        let mut state = self.state.lock().unwrap();
        state.delays.insert(path.to_string(), delay);
    }

    pub(crate) fn set_manifest_down(&self, down: bool) {
        self.state.lock().unwrap().manifest_down = down;
    }

    /// Fail the next `times` manifest fetches with a transient error.
    pub(crate) fn fail_manifest_transiently(&self, times: u32) {
        self.state.lock().unwrap().manifest_failures = times;
    }

    pub(crate) fn fetch_count(&self, path: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.fetch_counts.get(path).copied().unwrap_or(0)
    }

    pub(crate) fn total_fetches(&self) -> u32 {
        self.state.lock().unwrap().fetch_counts.values().sum()
    }

    pub(crate) fn manifest_fetches(&self) -> u32 {
        self.state.lock().unwrap().manifest_fetches
    }
}

#[async_trait]
impl ManifestProvider for MemoryProvider {
    async fn fetch_manifest(&self, version: Option<&str>) -> Result<Manifest> {
        let mut state = self.state.lock().unwrap();
        state.manifest_fetches += 1;
        if state.manifest_down {
            return Err(VendorError::ManifestUnavailable {
                url: "memory://manifest.json".to_string(),
                message: "source is down".to_string(),
                transient: false,
            });
        }
        if state.manifest_failures > 0 {
            state.manifest_failures -= 1;
            return Err(VendorError::ManifestUnavailable {
                url: "memory://manifest.json".to_string(),
                message: "status 503 Service Unavailable".to_string(),
                transient: true,
            });
        }

        match version {
            Some(pin) => state
                .manifests
                .iter()
                .find(|m| m.version == pin)
                .cloned()
                .ok_or_else(|| VendorError::InvalidVersion {
                    version: pin.to_string(),
                }),
            None => state
                .manifests
                .iter()
                .max_by(|a, b| compare_versions(&a.version, &b.version))
                .cloned()
                .ok_or_else(|| VendorError::ManifestUnavailable {
                    url: "memory://manifest.json".to_string(),
                    message: "nothing published".to_string(),
                    transient: false,
                }),
        }
    }

    async fn fetch_asset_content(&self, version: &str, asset: &Asset) -> Result<Bytes> {
        let (delay, outcome) = {
            let mut state = self.state.lock().unwrap();
            *state.fetch_counts.entry(asset.path.clone()).or_insert(0) += 1;
            let delay = state.delays.get(&asset.path).copied();

            let outcome = match state.transient_failures.get_mut(&asset.path) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    Err(VendorError::AssetFetchFailed {
                        path: asset.path.clone(),
                        message: "status 503 Service Unavailable".to_string(),
                        transient: true,
                    })
                }
                _ => state
                    .content
                    .get(&(version.to_string(), asset.path.clone()))
                    .cloned()
                    .ok_or_else(|| VendorError::AssetNotFound {
                        path: asset.path.clone(),
                    }),
            };
            (delay, outcome)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
