use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use mediastore_core::constants::LOCAL_PUBLIC_ROUTE;
use mediastore_core::StorageKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Files live at `<root>/<prefix>/<relative>` and are served publicly under
/// `/files/<relative>`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
    prefix: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `root` - Root directory for file storage (e.g., "./public")
    /// * `prefix` - Media folder applied to every key (e.g., "media")
    pub async fn new(root: impl Into<PathBuf>, prefix: &str) -> StorageResult<Self> {
        let root = root.into();
        let prefix = keys::normalize_prefix(prefix);
        let media_root = root.join(&prefix);

        fs::create_dir_all(&media_root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                media_root.display(),
                e
            ))
        })?;

        Ok(LocalStorage { root, prefix })
    }

    /// Directory mirrored by the public `/files/` route.
    pub fn media_root(&self) -> PathBuf {
        self.root.join(&self.prefix)
    }

    /// Convert a relative path to a filesystem path under the media root.
    fn key_to_path(&self, relative_path: &str) -> StorageResult<(String, PathBuf)> {
        let relative = keys::normalize(relative_path)?;
        let path = self.root.join(keys::prefixed(&self.prefix, &relative));
        Ok((relative, path))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save(&self, data: &[u8], relative_path: &str) -> StorageResult<String> {
        let (relative, path) = self.key_to_path(relative_path)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %relative,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage save successful"
        );

        Ok(self.resolve_url(&relative))
    }

    async fn read(&self, relative_path: &str) -> StorageResult<Vec<u8>> {
        let (relative, path) = self.key_to_path(relative_path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(relative));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            key = %relative,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }

    async fn exists(&self, relative_path: &str) -> StorageResult<bool> {
        let (_, path) = self.key_to_path(relative_path)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn content_length(&self, relative_path: &str) -> StorageResult<u64> {
        let (relative, path) = self.key_to_path(relative_path)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(relative))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn delete(&self, relative_path: &str) -> StorageResult<()> {
        let (relative, path) = self.key_to_path(relative_path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %relative,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<String> {
        let (from_key, from_path) = self.key_to_path(from)?;
        let (to_key, to_path) = self.key_to_path(to)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from_key));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::copy(&from_path, &to_path).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to copy {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        tracing::info!(
            from_key = %from_key,
            to_key = %to_key,
            "Local storage copy successful"
        );

        Ok(self.resolve_url(&to_key))
    }

    async fn relocate(&self, from: &str, to: &str) -> StorageResult<String> {
        let (from_key, from_path) = self.key_to_path(from)?;
        let (to_key, to_path) = self.key_to_path(to)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from_key));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::rename(&from_path, &to_path).await.map_err(|e| {
            StorageError::DeleteFailed(format!(
                "Failed to move {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        tracing::info!(
            from_key = %from_key,
            to_key = %to_key,
            "Local storage move successful"
        );

        Ok(self.resolve_url(&to_key))
    }

    fn resolve_url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            LOCAL_PUBLIC_ROUTE,
            relative_path.trim_start_matches('/')
        )
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        let path = keys::url_path(url);
        let relative = path.strip_prefix(LOCAL_PUBLIC_ROUTE)?.strip_prefix('/')?;
        keys::normalize(relative).ok()
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }
}
