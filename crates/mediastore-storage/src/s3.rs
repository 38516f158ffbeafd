use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use mediastore_core::{StorageConfig, StorageKind};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ClientOptions, ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::sync::Arc;
use std::time::Duration;

/// S3-compatible storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn object_store::ObjectStore>,
    bucket: String,
    prefix: String,
    public_base_url: String,
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl S3Storage {
    /// Build an S3 client from configuration.
    ///
    /// Explicit credentials take precedence over the environment. A custom
    /// `S3_ENDPOINT` selects an S3-compatible provider (MinIO, Spaces, R2).
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let bucket = config
            .s3_bucket
            .clone()
            .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
        let region = config
            .s3_region
            .clone()
            .ok_or_else(|| StorageError::ConfigError("S3_REGION not configured".to_string()))?;

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone())
            .with_client_options(
                ClientOptions::new().with_timeout(Duration::from_secs(config.cloud_timeout_secs)),
            );

        if let (Some(key_id), Some(secret)) = (
            config.s3_access_key_id.as_ref(),
            config.s3_secret_access_key.as_ref(),
        ) {
            builder = builder
                .with_access_key_id(key_id.clone())
                .with_secret_access_key(secret.clone());
        }

        if let Some(ref endpoint) = config.s3_endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        let public_base_url = match (&config.s3_public_url, &config.s3_endpoint) {
            (Some(public), _) => public.trim_end_matches('/').to_string(),
            // Path-style for S3-compatible providers: {endpoint}/{bucket}
            (None, Some(endpoint)) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
            (None, None) => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
        };

        Ok(Self::with_store(
            Arc::new(store),
            bucket,
            &config.media_folder,
            public_base_url,
        ))
    }

    /// Wrap an existing object store.
    pub fn with_store(
        store: Arc<dyn object_store::ObjectStore>,
        bucket: String,
        prefix: &str,
        public_base_url: String,
    ) -> Self {
        S3Storage {
            store,
            bucket,
            prefix: keys::normalize_prefix(prefix),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn location(&self, relative_path: &str) -> StorageResult<(String, Path)> {
        let relative = keys::normalize(relative_path)?;
        let key = keys::prefixed(&self.prefix, &relative);
        Ok((relative, Path::from(key)))
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn save(&self, data: &[u8], relative_path: &str) -> StorageResult<String> {
        let (relative, location) = self.location(relative_path)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put(&location, PutPayload::from(Bytes::copy_from_slice(data)))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %location,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %location,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.resolve_url(&relative))
    }

    async fn read(&self, relative_path: &str) -> StorageResult<Vec<u8>> {
        let (relative, location) = self.location(relative_path)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(relative.clone()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %location,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %location,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn exists(&self, relative_path: &str) -> StorageResult<bool> {
        let (_, location) = self.location(relative_path)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn content_length(&self, relative_path: &str) -> StorageResult<u64> {
        let (relative, location) = self.location(relative_path)?;
        match self.store.head(&location).await {
            Ok(meta) => Ok(meta.size),
            Err(ObjectStoreError::NotFound { .. }) => Err(StorageError::NotFound(relative)),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn delete(&self, relative_path: &str) -> StorageResult<()> {
        let (_, location) = self.location(relative_path)?;
        let start = std::time::Instant::now();

        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %location,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %location,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<String> {
        let start = std::time::Instant::now();
        let (from_key, from_location) = self.location(from)?;
        let (to_key, to_location) = self.location(to)?;

        let copy_result: ObjectResult<_> = self.store.copy(&from_location, &to_location).await;

        copy_result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(from_key.clone()),
            other => StorageError::BackendError(other.to_string()),
        })?;

        tracing::info!(
            from_key = %from_location,
            to_key = %to_location,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(self.resolve_url(&to_key))
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
        StorageKind::S3
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }
}
