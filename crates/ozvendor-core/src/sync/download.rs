//! Bounded-concurrency fetching of asset content.
//!
//! Fetches run as spawned tasks, at most `concurrency` at a time, and their
//! results come back in submission order. One failing asset never fails
//! the batch.

use crate::cancel::CancellationToken;
use crate::error::{Result, VendorError};
use crate::hashing::ContentHasher;
use crate::manifest::{Asset, ManifestProvider};
use crate::network::{retry_async, RetryConfig};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of fetching one asset.
#[derive(Debug)]
pub struct FetchOutcome {
    pub asset: Asset,
    pub result: Result<Bytes>,
    /// Attempts made; zero when the fetch never started.
    pub attempts: u32,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Downloads the content of selected assets from a [`ManifestProvider`].
#[derive(Clone)]
pub struct DownloadOrchestrator {
    provider: Arc<dyn ManifestProvider>,
    hasher: ContentHasher,
    concurrency: usize,
    retry: RetryConfig,
}

impl DownloadOrchestrator {
    pub fn new(
        provider: Arc<dyn ManifestProvider>,
        hasher: ContentHasher,
        concurrency: usize,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            hasher,
            concurrency: concurrency.max(1),
            retry,
        }
    }

    /// Fetch every asset of `selected` from manifest `version`.
    ///
    /// Content is checked against `Asset::hash`; a mismatch is a failure for
    /// that asset. Fetches not yet started when `cancel` fires are skipped
    /// with [`VendorError::Cancelled`].
    pub async fn download(
        &self,
        version: &str,
        selected: Vec<Asset>,
        cancel: &CancellationToken,
    ) -> Vec<FetchOutcome> {
        let total = selected.len();
        info!(
            "Downloading {} assets of version {} ({} at a time)",
            total, version, self.concurrency
        );

        let outcomes: Vec<FetchOutcome> = stream::iter(selected)
            .map(|asset| {
                let job = FetchJob {
                    provider: self.provider.clone(),
                    hasher: self.hasher,
                    retry: self.retry.clone(),
                    version: version.to_string(),
                    cancel: cancel.clone(),
                };
                let fallback = asset.clone();
                async move {
                    match tokio::spawn(job.run(asset)).await {
                        Ok(outcome) => outcome,
                        Err(e) => FetchOutcome {
                            result: Err(VendorError::AssetFetchFailed {
                                path: fallback.path.clone(),
                                message: format!("fetch task failed: {}", e),
                                transient: false,
                            }),
                            asset: fallback,
                            attempts: 0,
                        },
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!("{} of {} assets fetched", succeeded, total);
        outcomes
    }
}

/// Everything one spawned fetch needs, owned.
struct FetchJob {
    provider: Arc<dyn ManifestProvider>,
    hasher: ContentHasher,
    retry: RetryConfig,
    version: String,
    cancel: CancellationToken,
}

impl FetchJob {
    async fn run(self, asset: Asset) -> FetchOutcome {
        if self.cancel.is_cancelled() {
            return FetchOutcome {
                asset,
                result: Err(VendorError::Cancelled),
                attempts: 0,
            };
        }

        let (result, stats) = retry_async(
            &self.retry,
            || self.provider.fetch_asset_content(&self.version, &asset),
            |e: &VendorError| e.is_retryable() && !self.cancel.is_cancelled(),
        )
        .await;

        let result = result.and_then(|bytes| {
            let actual = self.hasher.hash_bytes(&bytes);
            if actual == asset.hash {
                Ok(bytes)
            } else {
                Err(VendorError::HashMismatch {
                    path: asset.path.clone(),
                    expected: asset.hash.clone(),
                    actual,
                })
            }
        });

        match &result {
            Ok(bytes) => debug!("Fetched {} ({} bytes)", asset.path, bytes.len()),
            Err(e) => warn!(
                "Fetching {} failed after {} attempts: {}",
                asset.path, stats.attempts, e
            ),
        }

        FetchOutcome {
            asset,
            result,
            attempts: stats.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryProvider;
    use std::time::Duration;

    fn orchestrator(provider: Arc<MemoryProvider>, concurrency: usize) -> DownloadOrchestrator {
        DownloadOrchestrator::new(
            provider,
            ContentHasher::default(),
            concurrency,
            RetryConfig::fixed(3, Duration::from_millis(1)),
        )
    }

    fn files() -> Vec<(&'static str, &'static str, &'static [u8])> {
        vec![
            ("token", "token/A.sol", &b"contract A {}"[..]),
            ("token", "token/B.sol", &b"contract B {}"[..]),
            ("math", "math/C.sol", &b"library C {}"[..]),
        ]
    }

    #[tokio::test]
    async fn test_results_in_submission_order() {
        let provider = Arc::new(MemoryProvider::new());
        let manifest = provider.publish("2.3.0", &files());
        provider.set_delay("token/A.sol", Duration::from_millis(30));

        let assets: Vec<Asset> = manifest.assets().cloned().collect();
        let outcomes = orchestrator(provider, 3)
            .download("2.3.0", assets, &CancellationToken::new())
            .await;

        let paths: Vec<_> = outcomes.iter().map(|o| o.asset.path.as_str()).collect();
        assert_eq!(paths, ["token/A.sol", "token/B.sol", "math/C.sol"]);
        assert!(outcomes.iter().all(|o| o.is_success()));
        assert_eq!(&outcomes[0].result.as_ref().unwrap()[..], b"contract A {}");
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let provider = Arc::new(MemoryProvider::new());
        let manifest = provider.publish("2.3.0", &files());
        provider.remove_content("2.3.0", "token/B.sol");

        let assets: Vec<Asset> = manifest.assets().cloned().collect();
        let outcomes = orchestrator(provider.clone(), 2)
            .download("2.3.0", assets, &CancellationToken::new())
            .await;

        assert!(outcomes[0].is_success());
        assert!(matches!(
            outcomes[1].result,
            Err(VendorError::AssetNotFound { .. })
        ));
        assert!(outcomes[2].is_success());
        // Not found is permanent: a single attempt.
        assert_eq!(provider.fetch_count("token/B.sol"), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let provider = Arc::new(MemoryProvider::new());
        let manifest = provider.publish("2.3.0", &files());
        provider.fail_transiently("math/C.sol", 2);

        let assets: Vec<Asset> = manifest.assets().cloned().collect();
        let outcomes = orchestrator(provider.clone(), 1)
            .download("2.3.0", assets, &CancellationToken::new())
            .await;

        assert!(outcomes[2].is_success());
        assert_eq!(outcomes[2].attempts, 3);
        assert_eq!(provider.fetch_count("math/C.sol"), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let provider = Arc::new(MemoryProvider::new());
        let manifest = provider.publish("2.3.0", &files());
        provider.fail_transiently("token/A.sol", 10);

        let assets: Vec<Asset> = manifest.assets().take(1).cloned().collect();
        let outcomes = orchestrator(provider.clone(), 1)
            .download("2.3.0", assets, &CancellationToken::new())
            .await;

        assert!(outcomes[0].result.as_ref().unwrap_err().is_retryable());
        assert_eq!(provider.fetch_count("token/A.sol"), 3);
    }

    #[tokio::test]
    async fn test_content_not_matching_manifest_hash_fails() {
        let provider = Arc::new(MemoryProvider::new());
        let manifest = provider.publish("2.3.0", &files());
        provider.corrupt_content("2.3.0", "token/A.sol", b"tampered");

        let assets: Vec<Asset> = manifest.assets().take(1).cloned().collect();
        let outcomes = orchestrator(provider, 1)
            .download("2.3.0", assets, &CancellationToken::new())
            .await;

        assert!(matches!(
            outcomes[0].result,
            Err(VendorError::HashMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_fetches() {
        let provider = Arc::new(MemoryProvider::new());
        let manifest = provider.publish("2.3.0", &files());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let assets: Vec<Asset> = manifest.assets().cloned().collect();
        let outcomes = orchestrator(provider.clone(), 2)
            .download("2.3.0", assets, &cancel)
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.result, Err(VendorError::Cancelled)) && o.attempts == 0));
        assert_eq!(provider.total_fetches(), 0);
    }
}
