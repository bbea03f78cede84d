//! Top-level sync coordinator.
//!
//! One attempt walks `Idle → ManifestFetched → Classified → PolicyResolved →
//! Downloading → Persisted → Idle`, or ends in `Aborted`. Local state is only
//! written in the persist step, after every fetch of the batch is known.

use crate::cancel::CancellationToken;
use crate::config::SyncConfig;
use crate::error::{Result, VendorError};
use crate::hashing::ContentHasher;
use crate::manifest::{compare_versions, Asset, CategorySummary, Manifest, ManifestProvider};
use crate::metadata::{atomic_write_bytes, LibraryLock, LocalRecord, ProjectStateStore};
use crate::network::{retry_async, HttpManifestProvider};
use crate::sync::classify::{
    classify, classify_asset, AssetClassification, ClassifiedAsset, DiskProbe, FileProbe,
};
use crate::sync::download::{DownloadOrchestrator, FetchOutcome};
use crate::sync::policy::{ConflictPolicy, Resolution};
use crate::sync::report::{FailedAsset, SkippedAsset, StatusReport, SyncReport};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Where a sync attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    ManifestFetched,
    Classified,
    PolicyResolved,
    Downloading,
    Persisted,
    Aborted,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::ManifestFetched => "manifest-fetched",
            SyncPhase::Classified => "classified",
            SyncPhase::PolicyResolved => "policy-resolved",
            SyncPhase::Downloading => "downloading",
            SyncPhase::Persisted => "persisted",
            SyncPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Outcome of applying the conflict policy.
#[derive(Debug, Default)]
struct SyncPlan {
    to_fetch: Vec<Asset>,
    /// Out-of-date paths the caller chose to replace.
    upgrades: HashSet<String>,
    /// Some out-of-date asset stays on its old content.
    upgrade_left_behind: bool,
    /// Files found identical to the manifest on rehash, to be recorded.
    adopted: Vec<Asset>,
}

/// Keeps one vendored library directory in sync with its remote source.
pub struct SyncController {
    config: SyncConfig,
    provider: Arc<dyn ManifestProvider>,
    store: ProjectStateStore,
    hasher: ContentHasher,
    phase: RwLock<SyncPhase>,
}

impl SyncController {
    /// Create a controller over an explicit provider.
    pub fn new(config: SyncConfig, provider: Arc<dyn ManifestProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: ProjectStateStore::new(config.project_file()),
            hasher: ContentHasher::new(config.hash_algorithm),
            config,
            provider,
            phase: RwLock::new(SyncPhase::Idle),
        })
    }

    /// Create a controller fetching from `config.source_url` over HTTP.
    pub fn from_config(config: SyncConfig) -> Result<Self> {
        let provider = HttpManifestProvider::new(&config.source_url)?;
        Self::new(config, Arc::new(provider))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The record as currently persisted.
    pub fn load_record(&self) -> Result<LocalRecord> {
        self.store.load()
    }

    /// List the categories of the targeted manifest.
    pub async fn categories(&self) -> Result<Vec<CategorySummary>> {
        self.config.check_version_pin()?;
        Ok(self.fetch_manifest().await?.summaries())
    }

    /// Classify the library against the targeted manifest without changing
    /// anything.
    pub async fn status(&self) -> Result<StatusReport> {
        self.config.check_version_pin()?;
        let record = self.store.load()?;
        let manifest = self.fetch_manifest().await?;
        let selected = manifest.select(&self.config.categories, &record)?;
        let assets = self.classify_all(&selected, &record).await?;

        let upgrade_available = compare_versions(&manifest.version, &record.version)
            == Ordering::Greater
            && assets
                .iter()
                .any(|c| matches!(c.classification, AssetClassification::OutOfDate { .. }));

        Ok(StatusReport {
            manifest_version: manifest.version,
            recorded_version: record.version,
            upgrade_available,
            assets,
        })
    }

    /// Run one sync attempt.
    ///
    /// Fatal errors and cancellation leave the record and the library
    /// untouched. Per-asset failures are itemized in the report.
    pub async fn sync(
        &self,
        policy: &dyn ConflictPolicy,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        self.enter(SyncPhase::Idle);
        let result = self.run(policy, cancel).await;

        match &result {
            Ok(report) => {
                let counts = report.counts();
                info!(
                    "Sync to {} done: {} downloaded, {} up to date, {} skipped, {} invalid, {} failed",
                    report.manifest_version,
                    counts.downloaded,
                    counts.up_to_date,
                    counts.skipped,
                    counts.invalid,
                    counts.failed
                );
                self.enter(SyncPhase::Idle);
            }
            Err(e) => {
                warn!("Sync aborted during {}: {}", self.phase(), e);
                self.enter(SyncPhase::Aborted);
            }
        }
        result
    }

    async fn run(&self, policy: &dyn ConflictPolicy, cancel: &CancellationToken) -> Result<SyncReport> {
        self.config.check_version_pin()?;
        let _lock = LibraryLock::acquire(&self.config.lock_file())?;
        let mut record = self.store.load()?;
        cancel.check()?;

        let manifest = self.fetch_manifest().await?;
        if compare_versions(&manifest.version, &record.version) == Ordering::Less {
            return Err(VendorError::VersionDowngrade {
                installed: record.version.clone(),
                offered: manifest.version.clone(),
            });
        }
        self.enter(SyncPhase::ManifestFetched);
        cancel.check()?;

        let selected = manifest.select(&self.config.categories, &record)?;
        let classified = self.classify_all(&selected, &record).await?;
        self.enter(SyncPhase::Classified);
        cancel.check()?;

        let mut report = SyncReport {
            manifest_version: manifest.version.clone(),
            previous_version: record.version.clone(),
            ..Default::default()
        };
        let plan = self.resolve(&classified, &record, &manifest.version, policy, &mut report)?;
        self.enter(SyncPhase::PolicyResolved);
        cancel.check()?;

        self.enter(SyncPhase::Downloading);
        let outcomes = if plan.to_fetch.is_empty() {
            Vec::new()
        } else {
            self.orchestrator()
                .download(&manifest.version, plan.to_fetch, cancel)
                .await
        };
        // Cancelled mid-batch: fetched content is discarded, nothing is written.
        cancel.check()?;

        let mut changed = false;
        let mut upgrade_left_behind = plan.upgrade_left_behind;

        for asset in plan.adopted {
            record.record(asset.path, asset.hash);
            changed = true;
        }

        for FetchOutcome {
            asset,
            result,
            attempts,
        } in outcomes
        {
            match result.and_then(|bytes| self.write_asset(&asset, &bytes)) {
                Ok(()) => {
                    record.record(asset.path.clone(), asset.hash.clone());
                    report.downloaded.push(asset.path);
                    changed = true;
                }
                Err(e) => {
                    if plan.upgrades.contains(&asset.path) {
                        upgrade_left_behind = true;
                    }
                    report.failed.push(FailedAsset {
                        path: asset.path,
                        error: e.to_string(),
                        attempts,
                    });
                }
            }
        }

        // The record only claims the new version once no installed file is
        // left on older content; otherwise the upgrade is offered again.
        if !upgrade_left_behind && record.version != manifest.version {
            record.version = manifest.version.clone();
            changed = true;
        }

        if changed {
            self.store.save(&record)?;
        }
        self.enter(SyncPhase::Persisted);

        report.recorded_version = record.version.clone();
        report.installed_count = record.installed.len();
        Ok(report)
    }

    /// Turn classifications into a fetch list, consulting the policy for
    /// conflicts.
    fn resolve(
        &self,
        classified: &[ClassifiedAsset],
        record: &LocalRecord,
        manifest_version: &str,
        policy: &dyn ConflictPolicy,
        report: &mut SyncReport,
    ) -> Result<SyncPlan> {
        let has_stale = classified
            .iter()
            .any(|c| matches!(c.classification, AssetClassification::OutOfDate { .. }));
        report.upgrade_available =
            has_stale && compare_versions(manifest_version, &record.version) == Ordering::Greater;
        report.upgrade_accepted =
            report.upgrade_available && policy.accept_upgrade(&record.version, manifest_version);

        if report.upgrade_available {
            info!(
                "Library upgrade {} -> {} available, accepted: {}",
                record.version, manifest_version, report.upgrade_accepted
            );
        }

        let probe = self.probe();
        let mut plan = SyncPlan::default();

        for item in classified {
            let asset = &item.asset;
            let mut classification = item.classification.clone();
            let mut rehashes = 0;

            loop {
                let stale = matches!(classification, AssetClassification::OutOfDate { .. });

                match classification {
                    AssetClassification::Missing | AssetClassification::ModifiedLocally => {
                        plan.to_fetch.push(asset.clone());
                        break;
                    }
                    AssetClassification::UpToDate => {
                        report.up_to_date.push(asset.path.clone());
                        break;
                    }
                    _ if stale && !report.upgrade_accepted => {
                        plan.upgrade_left_behind = true;
                        report.skipped.push(SkippedAsset {
                            path: asset.path.clone(),
                            classification: classification.clone(),
                        });
                        break;
                    }
                    _ => {}
                }

                let decision = if rehashes >= self.config.rehash_attempts {
                    Resolution::Skip
                } else {
                    policy.resolve(asset, &classification)
                };

                match decision {
                    Resolution::Skip => {
                        let skipped = SkippedAsset {
                            path: asset.path.clone(),
                            classification: classification.clone(),
                        };
                        if stale {
                            plan.upgrade_left_behind = true;
                            report.skipped.push(skipped);
                        } else {
                            report.invalid.push(skipped);
                        }
                        break;
                    }
                    Resolution::Replace => {
                        if stale {
                            plan.upgrades.insert(asset.path.clone());
                        }
                        plan.to_fetch.push(asset.clone());
                        break;
                    }
                    Resolution::Retry => {
                        rehashes += 1;
                        // Bytes identical to the manifest's are taken over as
                        // installed, whatever the record says about them.
                        if probe.hash(&asset.path).is_ok_and(|h| h == asset.hash) {
                            debug!("Adopting {}: content matches the manifest", asset.path);
                            plan.adopted.push(asset.clone());
                            report.up_to_date.push(asset.path.clone());
                            break;
                        }
                        classification = classify_asset(asset, record, &probe);
                        debug!(
                            "Rehashed {} (round {}): {}",
                            asset.path,
                            rehashes,
                            classification.label()
                        );
                    }
                    Resolution::Abort => {
                        info!("Conflict policy aborted the sync at {}", asset.path);
                        return Err(VendorError::Cancelled);
                    }
                }
            }
        }

        Ok(plan)
    }

    async fn fetch_manifest(&self) -> Result<Manifest> {
        let version = self.config.version.as_deref();
        let (result, stats) = retry_async(
            &self.config.retry_config(),
            || self.provider.fetch_manifest(version),
            |e: &VendorError| e.is_retryable(),
        )
        .await;

        let manifest = result.map_err(|e| self.as_manifest_error(e))?;
        if stats.attempts > 1 {
            debug!("Manifest fetched after {} attempts", stats.attempts);
        }
        manifest.validate().map_err(|e| self.as_manifest_error(e))?;
        Ok(manifest)
    }

    fn as_manifest_error(&self, err: VendorError) -> VendorError {
        match err {
            VendorError::ManifestUnavailable { .. } | VendorError::InvalidVersion { .. } => err,
            other => VendorError::ManifestUnavailable {
                url: self.config.source_url.clone(),
                message: other.to_string(),
                transient: other.is_retryable(),
            },
        }
    }

    async fn classify_all(
        &self,
        manifest: &Manifest,
        record: &LocalRecord,
    ) -> Result<Vec<ClassifiedAsset>> {
        let probe = self.probe();
        let manifest = manifest.clone();
        let record = record.clone();

        tokio::task::spawn_blocking(move || classify(&manifest, &record, &probe))
            .await
            .map_err(|e| VendorError::Io {
                message: format!("classification task failed: {}", e),
                path: None,
                source: None,
            })
    }

    fn write_asset(&self, asset: &Asset, bytes: &[u8]) -> Result<()> {
        atomic_write_bytes(&self.config.library_dir.join(&asset.path), bytes)
    }

    fn probe(&self) -> DiskProbe {
        DiskProbe::new(&self.config.library_dir, self.hasher)
    }

    fn orchestrator(&self) -> DownloadOrchestrator {
        DownloadOrchestrator::new(
            self.provider.clone(),
            self.hasher,
            self.config.concurrency,
            self.config.retry_config(),
        )
    }

    fn enter(&self, next: SyncPhase) {
        let mut phase = self.phase.write().unwrap_or_else(PoisonError::into_inner);
        if *phase != next {
            debug!("Sync phase {} -> {}", *phase, next);
            *phase = next;
        }
    }
}
