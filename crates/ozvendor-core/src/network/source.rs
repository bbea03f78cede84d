//! HTTP-backed manifest provider.
//!
//! Layout of the remote distribution under its base URL:
//! - `manifest.json`: manifest of the latest version
//! - `<version>/manifest.json`: manifest of a pinned version
//! - `<version>/<asset path>`: raw asset bytes

use crate::config::NetworkConfig;
use crate::manifest::{Asset, Manifest, ManifestProvider};
use crate::network::client::{extract_domain, HttpClient};
use crate::{Result, VendorError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{debug, info};
use url::Url;

/// Fetches manifests and asset content over HTTP.
#[derive(Debug, Clone)]
pub struct HttpManifestProvider {
    http: HttpClient,
    base_url: String,
}

impl HttpManifestProvider {
    /// Create a provider for the distribution rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(base_url, HttpClient::new()?)
    }

    pub fn with_client(base_url: &str, http: HttpClient) -> Result<Self> {
        Url::parse(base_url).map_err(|e| VendorError::Config {
            message: format!("invalid source url {}: {}", base_url, e),
        })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn manifest_url(&self, version: Option<&str>) -> String {
        match version {
            Some(v) => format!("{}/{}/{}", self.base_url, v, NetworkConfig::MANIFEST_FILE_NAME),
            None => format!("{}/{}", self.base_url, NetworkConfig::MANIFEST_FILE_NAME),
        }
    }

    pub fn asset_url(&self, version: &str, asset: &Asset) -> String {
        format!("{}/{}/{}", self.base_url, version, asset.path)
    }
}

#[async_trait]
impl ManifestProvider for HttpManifestProvider {
    async fn fetch_manifest(&self, version: Option<&str>) -> Result<Manifest> {
        let url = self.manifest_url(version);
        let unavailable = |message: String, transient: bool| VendorError::ManifestUnavailable {
            url: url.clone(),
            message,
            transient,
        };

        let response = self
            .http
            .get(&url)
            .await
            .map_err(|e| unavailable(e.to_string(), e.is_retryable()))?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            if let Some(pin) = version {
                return Err(VendorError::InvalidVersion {
                    version: pin.to_string(),
                });
            }
        }
        if !status.is_success() {
            return Err(unavailable(
                format!("status {}", status),
                HttpClient::is_retryable_status(status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unavailable(format!("failed to read body: {}", e), true))?;
        let manifest =
            Manifest::from_json(&body).map_err(|e| unavailable(e.to_string(), false))?;

        if let Some(pin) = version {
            if manifest.version != pin {
                return Err(VendorError::InvalidVersion {
                    version: pin.to_string(),
                });
            }
        }

        info!(
            "Fetched manifest {} from {} ({} assets)",
            manifest.version,
            extract_domain(&url),
            manifest.asset_count()
        );
        Ok(manifest)
    }

    async fn fetch_asset_content(&self, version: &str, asset: &Asset) -> Result<Bytes> {
        let url = self.asset_url(version, asset);
        let failed = |message: String, transient: bool| VendorError::AssetFetchFailed {
            path: asset.path.clone(),
            message,
            transient,
        };

        let response = self
            .http
            .get(&url)
            .await
            .map_err(|e| failed(e.to_string(), true))?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(VendorError::AssetNotFound {
                path: asset.path.clone(),
            });
        }
        if !status.is_success() {
            return Err(failed(
                format!("status {}", status),
                HttpClient::is_retryable_status(status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| failed(format!("failed to read body: {}", e), true))?;
        debug!("Fetched {} ({} bytes)", asset.path, body.len());
        Ok(body)
    }
}
