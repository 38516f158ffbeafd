//! CDN media-service backend.
//!
//! Talks to an HTTP storage-zone API: `PUT`/`GET`/`DELETE` on
//! `{endpoint}/{zone}/{prefix}/{relative}` authenticated with an `AccessKey`
//! header. Public URLs are `{public_url}/{prefix}/{relative}`.

use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use mediastore_core::{StorageConfig, StorageKind};
use reqwest::{Client, StatusCode};
use std::time::Duration;

#[derive(Clone)]
pub struct CdnStorage {
    client: Client,
    endpoint: String,
    zone: String,
    access_key: String,
    prefix: String,
    public_base_url: String,
}

impl std::fmt::Debug for CdnStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnStorage")
            .field("endpoint", &self.endpoint)
            .field("zone", &self.zone)
            .field("access_key", &"[REDACTED]")
            .field("prefix", &self.prefix)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl CdnStorage {
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let zone = config.cdn_storage_zone.clone().ok_or_else(|| {
            StorageError::ConfigError("CDN_STORAGE_ZONE not configured".to_string())
        })?;
        let public_base_url = config.cdn_public_url.clone().ok_or_else(|| {
            StorageError::ConfigError("CDN_PUBLIC_URL not configured".to_string())
        })?;
        let access_key = config.cdn_access_key.clone().ok_or_else(|| {
            StorageError::ConfigError("CDN_ACCESS_KEY not configured".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.cloud_timeout_secs))
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self::with_client(
            client,
            &config.cdn_storage_endpoint,
            zone,
            access_key,
            &config.media_folder,
            &public_base_url,
        ))
    }

    pub fn with_client(
        client: Client,
        endpoint: &str,
        zone: String,
        access_key: String,
        prefix: &str,
        public_base_url: &str,
    ) -> Self {
        CdnStorage {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            zone,
            access_key,
            prefix: keys::normalize_prefix(prefix),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Storage API URL plus the normalized relative path.
    fn object_url(&self, relative_path: &str) -> StorageResult<(String, String)> {
        let relative = keys::normalize(relative_path)?;
        let key = keys::prefixed(&self.prefix, &relative);
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let url = format!("{}/{}/{}", self.endpoint, self.zone, encoded.join("/"));
        Ok((relative, url))
    }

    fn backend_error(context: &str, status: StatusCode) -> String {
        format!("{} returned HTTP {}", context, status.as_u16())
    }
}

#[async_trait]
impl Storage for CdnStorage {
    async fn save(&self, data: &[u8], relative_path: &str) -> StorageResult<String> {
        let (relative, url) = self.object_url(relative_path)?;
        let size = data.len();
        let start = std::time::Instant::now();

        let response = self
            .client
            .put(&url)
            .header("AccessKey", &self.access_key)
            .header("Content-Type", "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    zone = %self.zone,
                    key = %relative,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "CDN upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(
                status = status.as_u16(),
                zone = %self.zone,
                key = %relative,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "CDN upload rejected"
            );
            return Err(StorageError::UploadFailed(Self::backend_error(
                "CDN upload",
                status,
            )));
        }

        tracing::info!(
            zone = %self.zone,
            key = %relative,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "CDN upload successful"
        );

        Ok(self.resolve_url(&relative))
    }

    async fn read(&self, relative_path: &str) -> StorageResult<Vec<u8>> {
        let (relative, url) = self.object_url(relative_path)?;

        let response = self
            .client
            .get(&url)
            .header("AccessKey", &self.access_key)
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(relative)),
            status if !status.is_success() => Err(StorageError::DownloadFailed(
                Self::backend_error("CDN download", status),
            )),
            _ => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
                Ok(bytes.to_vec())
            }
        }
    }

    async fn exists(&self, relative_path: &str) -> StorageResult<bool> {
        let (_, url) = self.object_url(relative_path)?;

        let response = self
            .client
            .head(&url)
            .header("AccessKey", &self.access_key)
            .send()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(StorageError::BackendError(Self::backend_error(
                "CDN head",
                status,
            ))),
        }
    }

    async fn content_length(&self, relative_path: &str) -> StorageResult<u64> {
        let (relative, url) = self.object_url(relative_path)?;

        let response = self
            .client
            .head(&url)
            .header("AccessKey", &self.access_key)
            .send()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(relative)),
            status if !status.is_success() => Err(StorageError::BackendError(
                Self::backend_error("CDN head", status),
            )),
            _ => response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| {
                    StorageError::BackendError("CDN head returned no content length".to_string())
                }),
        }
    }

    async fn delete(&self, relative_path: &str) -> StorageResult<()> {
        let (relative, url) = self.object_url(relative_path)?;
        let start = std::time::Instant::now();

        let response = self
            .client
            .delete(&url)
            .header("AccessKey", &self.access_key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            tracing::error!(
                status = status.as_u16(),
                zone = %self.zone,
                key = %relative,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "CDN delete failed"
            );
            return Err(StorageError::DeleteFailed(Self::backend_error(
                "CDN delete",
                status,
            )));
        }

        tracing::info!(
            zone = %self.zone,
            key = %relative,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "CDN delete successful"
        );

        Ok(())
    }

    /// The storage API has no server-side copy; bytes go through this process.
    async fn copy(&self, from: &str, to: &str) -> StorageResult<String> {
        let data = self.read(from).await?;
        self.save(&data, to).await
    }

    fn resolve_url(&self, relative_path: &str) -> String {
        let relative = relative_path.trim_start_matches('/');
        format!(
            "{}/{}",
            self.public_base_url,
            keys::prefixed(&self.prefix, relative)
        )
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base_url)?.strip_prefix('/')?;
        let relative = if self.prefix.is_empty() {
            rest
        } else {
            rest.strip_prefix(&self.prefix)?.strip_prefix('/')?
        };
        keys::normalize(relative).ok()
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Cdn
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }
}
