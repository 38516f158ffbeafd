use crate::{CdnStorage, LocalStorage, S3Storage, Storage, StorageResult};
use async_trait::async_trait;
use mediastore_core::{StorageConfig, StorageKind};

/// The configured storage backend.
///
/// Selected once from configuration by [`create_storage`] and shared by
/// reference (usually as `Arc<dyn Storage>`) with every component.
#[derive(Clone, Debug)]
pub enum StorageBackend {
    Local(LocalStorage),
    S3(S3Storage),
    Cdn(CdnStorage),
}

impl StorageBackend {
    fn inner(&self) -> &dyn Storage {
        match self {
            StorageBackend::Local(s) => s,
            StorageBackend::S3(s) => s,
            StorageBackend::Cdn(s) => s,
        }
    }
}

/// Create the storage backend named by configuration
pub async fn create_storage(config: &StorageConfig) -> StorageResult<StorageBackend> {
    let backend = match config.kind {
        StorageKind::Local => {
            StorageBackend::Local(LocalStorage::new(&config.local_root, &config.media_folder).await?)
        }
        StorageKind::S3 => StorageBackend::S3(S3Storage::new(config)?),
        StorageKind::Cdn => StorageBackend::Cdn(CdnStorage::new(config)?),
    };

    tracing::info!(
        backend = %config.kind,
        prefix = %backend.prefix(),
        "Storage backend initialized"
    );

    Ok(backend)
}

#[async_trait]
impl Storage for StorageBackend {
    async fn save(&self, data: &[u8], relative_path: &str) -> StorageResult<String> {
        self.inner().save(data, relative_path).await
    }

    async fn read(&self, relative_path: &str) -> StorageResult<Vec<u8>> {
        self.inner().read(relative_path).await
    }

    async fn exists(&self, relative_path: &str) -> StorageResult<bool> {
        self.inner().exists(relative_path).await
    }

    async fn content_length(&self, relative_path: &str) -> StorageResult<u64> {
        self.inner().content_length(relative_path).await
    }

    async fn delete(&self, relative_path: &str) -> StorageResult<()> {
        self.inner().delete(relative_path).await
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<String> {
        self.inner().copy(from, to).await
    }

    async fn relocate(&self, from: &str, to: &str) -> StorageResult<String> {
        self.inner().relocate(from, to).await
    }

    async fn move_to_trash(&self, relative_path: &str) -> StorageResult<String> {
        self.inner().move_to_trash(relative_path).await
    }

    fn resolve_url(&self, relative_path: &str) -> String {
        self.inner().resolve_url(relative_path)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        self.inner().key_from_url(url)
    }

    fn kind(&self) -> StorageKind {
        self.inner().kind()
    }

    fn prefix(&self) -> &str {
        self.inner().prefix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_local_storage() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::local(dir.path(), "/media/");
        let backend = create_storage(&config).await.unwrap();

        assert!(matches!(backend, StorageBackend::Local(_)));
        assert_eq!(backend.kind(), StorageKind::Local);
        assert_eq!(backend.prefix(), "media");

        let url = backend.save(b"abc", "a.txt").await.unwrap();
        assert_eq!(url, "/files/a.txt");
        assert!(dir.path().join("media/a.txt").exists());
    }

    #[tokio::test]
    async fn test_create_cdn_requires_zone() {
        let dir = tempdir().unwrap();
        let mut config = StorageConfig::local(dir.path(), "media");
        config.kind = StorageKind::Cdn;
        let result = create_storage(&config).await;
        assert!(matches!(result, Err(crate::StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_create_s3_without_endpoint_builds_public_url() {
        let dir = tempdir().unwrap();
        let mut config = StorageConfig::local(dir.path(), "media");
        config.kind = StorageKind::S3;
        config.s3_bucket = Some("bucket".to_string());
        config.s3_region = Some("eu-west-1".to_string());
        config.s3_access_key_id = Some("id".to_string());
        config.s3_secret_access_key = Some("secret".to_string());

        let backend = create_storage(&config).await.unwrap();
        assert_eq!(backend.kind(), StorageKind::S3);
        assert_eq!(
            backend.resolve_url("a/b.png"),
            "https://bucket.s3.eu-west-1.amazonaws.com/media/a/b.png"
        );
    }
}
