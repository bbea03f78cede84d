use crate::config::LibraryConfig;
use crate::error::{Result, VendorError};
use crate::metadata::LocalRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path};

/// One vendored contract source file.
///
/// Identity is `(category, name)`; `path` is relative to the library
/// directory and `hash` is the digest of the canonical remote bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    pub name: String,
    pub path: String,
    pub hash: String,
}

impl Asset {
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            path: path.into(),
            hash: hash.into(),
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> (&str, &str) {
        (&self.category, &self.name)
    }
}

/// A named group of assets, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// Category name with its asset count, for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub name: String,
    pub asset_count: usize,
}

/// Snapshot of the remote catalog for one library version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Manifest {
    /// Parse a manifest document and check it is usable.
    ///
    /// Each asset inherits the name of its enclosing category.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let mut manifest: Manifest = serde_json::from_slice(data)?;
        for category in &mut manifest.categories {
            for asset in &mut category.assets {
                asset.category = category.name.clone();
            }
        }
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reject manifests that could write outside the library directory,
    /// over the library's own state files, or map two assets onto one file.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(invalid("manifest has no version"));
        }

        let mut seen = HashSet::new();
        for asset in self.assets() {
            if asset.path.is_empty() || asset.hash.is_empty() {
                return Err(invalid(&format!(
                    "asset {}/{} has an empty path or hash",
                    asset.category, asset.name
                )));
            }
            let confined = Path::new(&asset.path)
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if !confined {
                return Err(invalid(&format!("asset path escapes library: {}", asset.path)));
            }
            if is_reserved(&asset.path) {
                return Err(invalid(&format!(
                    "asset path collides with library state: {}",
                    asset.path
                )));
            }
            if !seen.insert(asset.path.as_str()) {
                return Err(invalid(&format!("duplicate asset path: {}", asset.path)));
            }
        }
        Ok(())
    }

    /// Every asset in category order, then asset order.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.categories.iter().flat_map(|c| c.assets.iter())
    }

    pub fn asset_count(&self) -> usize {
        self.categories.iter().map(|c| c.assets.len()).sum()
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn summaries(&self) -> Vec<CategorySummary> {
        self.categories
            .iter()
            .map(|c| CategorySummary {
                name: c.name.clone(),
                asset_count: c.assets.len(),
            })
            .collect()
    }

    /// Restrict the manifest to the requested categories.
    ///
    /// Categories holding an asset the record already tracks are always
    /// kept, so earlier installs stay maintained. An empty request keeps
    /// everything.
    pub fn select(&self, requested: &[String], record: &LocalRecord) -> Result<Manifest> {
        if requested.is_empty() {
            return Ok(self.clone());
        }

        if let Some(unknown) = requested.iter().find(|name| self.category(name).is_none()) {
            return Err(VendorError::Config {
                message: format!(
                    "category {} does not exist in library version {}",
                    unknown, self.version
                ),
            });
        }

        let categories = self
            .categories
            .iter()
            .filter(|c| {
                requested.contains(&c.name)
                    || c.assets
                        .iter()
                        .any(|a| record.recorded_hash(&a.path).is_some())
            })
            .cloned()
            .collect();

        Ok(Manifest {
            version: self.version.clone(),
            categories,
        })
    }
}

/// Paths the library directory keeps for its own bookkeeping.
fn is_reserved(path: &str) -> bool {
    let backup = format!(
        "{}{}",
        LibraryConfig::PROJECT_FILE_NAME,
        LibraryConfig::BACKUP_SUFFIX
    );
    path == LibraryConfig::PROJECT_FILE_NAME
        || path == backup
        || path == LibraryConfig::LOCK_FILE_NAME
        || path.ends_with(LibraryConfig::DOWNLOAD_TEMP_SUFFIX)
}

fn invalid(message: &str) -> VendorError {
    VendorError::Config {
        message: format!("invalid manifest: {}", message),
    }
}
