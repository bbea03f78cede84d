//! Caller-supplied decisions for assets the core will not resolve alone.
//!
//! The policy is consulted synchronously, once per `Invalid` asset and once
//! per `OutOfDate` asset of an accepted upgrade. The core embeds no
//! presentation: a UI implements [`ConflictPolicy`] on top of its dialogs.

use crate::manifest::Asset;
use crate::sync::classify::AssetClassification;
use serde::{Deserialize, Serialize};

/// Decision for one conflicting asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Leave the local file and its record entry untouched.
    Skip,
    /// Overwrite the local file with the manifest's content.
    Replace,
    /// Hash the local file again and reclassify it.
    Retry,
    /// Cancel the whole sync attempt.
    Abort,
}

/// Resolves conflicts during a sync.
pub trait ConflictPolicy: Send + Sync {
    /// Decide what to do with an `Invalid` or `OutOfDate` asset.
    fn resolve(&self, asset: &Asset, classification: &AssetClassification) -> Resolution;

    /// Whether to move the library from `from` to the newer `to` version.
    ///
    /// Asked once per attempt, only when the manifest is newer than the
    /// record and at least one installed file is out of date.
    fn accept_upgrade(&self, _from: &str, _to: &str) -> bool {
        true
    }
}

impl<F> ConflictPolicy for F
where
    F: Fn(&Asset, &AssetClassification) -> Resolution + Send + Sync,
{
    fn resolve(&self, asset: &Asset, classification: &AssetClassification) -> Resolution {
        self(asset, classification)
    }
}

/// A policy giving the same answer for every asset of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticPolicy {
    pub on_invalid: Resolution,
    pub on_out_of_date: Resolution,
    pub upgrade: bool,
}

impl StaticPolicy {
    /// Report conflicts, touch nothing, decline upgrades.
    pub fn surface_conflicts() -> Self {
        Self {
            on_invalid: Resolution::Skip,
            on_out_of_date: Resolution::Skip,
            upgrade: false,
        }
    }

    /// Upgrade unmodified files, leave modified ones alone.
    pub fn accept_upgrades() -> Self {
        Self {
            on_invalid: Resolution::Skip,
            on_out_of_date: Resolution::Replace,
            upgrade: true,
        }
    }

    /// Make the local copy match the manifest exactly.
    pub fn replace_all() -> Self {
        Self {
            on_invalid: Resolution::Replace,
            on_out_of_date: Resolution::Replace,
            upgrade: true,
        }
    }
}

impl Default for StaticPolicy {
    fn default() -> Self {
        Self::surface_conflicts()
    }
}

impl ConflictPolicy for StaticPolicy {
    fn resolve(&self, _asset: &Asset, classification: &AssetClassification) -> Resolution {
        match classification {
            AssetClassification::Invalid(_) => self.on_invalid,
            AssetClassification::OutOfDate { .. } => self.on_out_of_date,
            _ => Resolution::Skip,
        }
    }

    fn accept_upgrade(&self, _from: &str, _to: &str) -> bool {
        self.upgrade
    }
}
