//! Reconciliation of a local library with a manifest.
//!
//! This module provides:
//! - Per-asset classification against the local record and the disk
//! - The caller-facing conflict policy
//! - Bounded-concurrency downloading
//! - The `SyncController` state machine tying them together

mod classify;
mod controller;
mod download;
mod policy;
mod report;

pub use classify::{
    classify, classify_asset, AssetClassification, ClassifiedAsset, DiskProbe, FileProbe,
    InvalidReason,
};
pub use controller::{SyncController, SyncPhase};
pub use download::{DownloadOrchestrator, FetchOutcome};
pub use policy::{ConflictPolicy, Resolution, StaticPolicy};
pub use report::{FailedAsset, SkippedAsset, StatusReport, SyncCounts, SyncReport};
