//! Storage setup and initialization

use anyhow::{Context, Result};
use mediastore_core::Config;
use mediastore_storage::{create_storage, Storage, StorageBackend};
use std::path::PathBuf;
use std::sync::Arc;

/// Create the configured backend. For the local backend also return the
/// directory to serve under `/files`.
pub async fn setup_storage(config: &Config) -> Result<(Arc<dyn Storage>, Option<PathBuf>)> {
    let backend = create_storage(config.storage())
        .await
        .context("Failed to initialize storage backend")?;

    let public_root = match &backend {
        StorageBackend::Local(local) => Some(local.media_root()),
        StorageBackend::S3(_) | StorageBackend::Cdn(_) => None,
    };
    if let Some(root) = &public_root {
        tracing::info!(root = %root.display(), "Serving local media under /files");
    }

    Ok((Arc::new(backend), public_root))
}
