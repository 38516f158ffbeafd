//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use mediastore_core::{AppError, StorageKind};
use thiserror::Error;

use crate::keys;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("File not found: {}", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidArgument(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Every method takes a path relative to the configured media folder. Backends
/// normalize it and always apply the folder as a key prefix, so
/// `save(bytes, "a/b.png")` lands at `<folder>/a/b.png` on every backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write bytes and return the public URL.
    async fn save(&self, data: &[u8], relative_path: &str) -> StorageResult<String>;

    /// Read bytes. Fails with `NotFound` if absent.
    async fn read(&self, relative_path: &str) -> StorageResult<Vec<u8>>;

    async fn exists(&self, relative_path: &str) -> StorageResult<bool>;

    /// Size in bytes of a stored object.
    async fn content_length(&self, relative_path: &str) -> StorageResult<u64>;

    /// Remove an object. Deleting a missing object succeeds.
    async fn delete(&self, relative_path: &str) -> StorageResult<()>;

    /// Copy an object and return the destination URL.
    async fn copy(&self, from: &str, to: &str) -> StorageResult<String>;

    /// Move an object and return the destination URL.
    ///
    /// The default copies then deletes the source. A failed delete is
    /// returned after the copy has already succeeded.
    async fn relocate(&self, from: &str, to: &str) -> StorageResult<String> {
        let url = self.copy(from, to).await?;
        self.delete(from).await?;
        Ok(url)
    }

    /// Move an object into the trash area and return its trash-relative path.
    async fn move_to_trash(&self, relative_path: &str) -> StorageResult<String> {
        let relative = keys::normalize(relative_path)?;
        let trash = keys::trash_path(&relative);
        self.relocate(&relative, &trash).await?;
        Ok(trash)
    }

    /// Public URL for a relative path. Pure, no I/O.
    fn resolve_url(&self, relative_path: &str) -> String;

    /// Inverse of [`Storage::resolve_url`]: the relative path behind a URL
    /// produced by this backend.
    fn key_from_url(&self, url: &str) -> Option<String>;

    fn kind(&self) -> StorageKind;

    /// Configured key prefix (media folder).
    fn prefix(&self) -> &str;
}
