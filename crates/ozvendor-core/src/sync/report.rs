//! Structured outcome of a sync, for the caller to render.

use crate::sync::classify::{AssetClassification, ClassifiedAsset};
use serde::Serialize;

/// An asset left as it was, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAsset {
    pub path: String,
    pub classification: AssetClassification,
}

/// An asset that could not be fetched or written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAsset {
    pub path: String,
    pub error: String,
    pub attempts: u32,
}

/// Per-outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCounts {
    pub downloaded: usize,
    pub up_to_date: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub failed: usize,
}

/// Result of one completed sync attempt.
///
/// `invalid` lists conflicting files that were left in place; `skipped`
/// lists out-of-date files whose upgrade was declined or not offered.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub manifest_version: String,
    pub previous_version: String,
    pub recorded_version: String,
    pub upgrade_available: bool,
    pub upgrade_accepted: bool,
    pub downloaded: Vec<String>,
    pub up_to_date: Vec<String>,
    pub skipped: Vec<SkippedAsset>,
    pub invalid: Vec<SkippedAsset>,
    pub failed: Vec<FailedAsset>,
    /// Files tracked by the record after the sync.
    pub installed_count: usize,
}

impl SyncReport {
    pub fn counts(&self) -> SyncCounts {
        SyncCounts {
            downloaded: self.downloaded.len(),
            up_to_date: self.up_to_date.len(),
            skipped: self.skipped.len(),
            invalid: self.invalid.len(),
            failed: self.failed.len(),
        }
    }

    /// True when nothing failed and no conflict was left unresolved.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.invalid.is_empty()
    }
}

/// Classification-only view of a library, produced without downloading.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub manifest_version: String,
    pub recorded_version: String,
    pub upgrade_available: bool,
    pub assets: Vec<ClassifiedAsset>,
}

impl StatusReport {
    /// Paths of files that were modified or removed since the last sync.
    pub fn drifted_paths(&self) -> Vec<&str> {
        self.assets
            .iter()
            .filter(|c| {
                matches!(
                    c.classification,
                    AssetClassification::Invalid(_) | AssetClassification::ModifiedLocally
                )
            })
            .map(|c| c.asset.path.as_str())
            .collect()
    }

    pub fn count(&self, label: &str) -> usize {
        self.assets
            .iter()
            .filter(|c| c.classification.label() == label)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Asset;
    use crate::sync::classify::InvalidReason;

    #[test]
    fn test_counts_and_completeness() {
        let mut report = SyncReport {
            downloaded: vec!["a.sol".into(), "b.sol".into()],
            up_to_date: vec!["c.sol".into()],
            ..Default::default()
        };
        assert!(report.is_complete());

        report.failed.push(FailedAsset {
            path: "d.sol".into(),
            error: "not found".into(),
            attempts: 1,
        });
        let counts = report.counts();
        assert_eq!(counts.downloaded, 2);
        assert_eq!(counts.up_to_date, 1);
        assert_eq!(counts.failed, 1);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = SyncReport {
            manifest_version: "2.4.0".into(),
            invalid: vec![SkippedAsset {
                path: "token/ERC20.sol".into(),
                classification: AssetClassification::Invalid(InvalidReason::UnknownProvenance),
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["manifestVersion"], "2.4.0");
        assert_eq!(json["invalid"][0]["classification"]["state"], "invalid");
        assert_eq!(
            json["invalid"][0]["classification"]["reason"],
            "unknownProvenance"
        );
    }

    #[test]
    fn test_drifted_paths() {
        let status = StatusReport {
            manifest_version: "2.3.0".into(),
            recorded_version: "2.3.0".into(),
            upgrade_available: false,
            assets: vec![
                ClassifiedAsset {
                    asset: Asset::new("token", "A.sol", "token/A.sol", "h"),
                    classification: AssetClassification::UpToDate,
                },
                ClassifiedAsset {
                    asset: Asset::new("token", "B.sol", "token/B.sol", "h"),
                    classification: AssetClassification::ModifiedLocally,
                },
            ],
        };

        assert_eq!(status.drifted_paths(), ["token/B.sol"]);
        assert_eq!(status.count("upToDate"), 1);
    }
}
