//! Metadata store setup

use anyhow::{Context, Result};
use mediastore_core::Config;
use mediastore_db::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use std::sync::Arc;

const MAX_CONNECTIONS: u32 = 10;

/// Postgres when `DATABASE_URL` is set, otherwise an in-memory store that
/// loses everything on restart.
pub async fn setup_document_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let Some(url) = config.database_url() else {
        tracing::warn!("DATABASE_URL not set, using the in-memory metadata store");
        return Ok(Arc::new(MemoryDocumentStore::new()));
    };

    tracing::info!("Connecting to database...");
    let store = PgDocumentStore::connect(url, MAX_CONNECTIONS)
        .await
        .context("Failed to connect to database")?;
    store
        .migrate()
        .await
        .context("Failed to run database migrations")?;
    tracing::info!(max_connections = MAX_CONNECTIONS, "Database connected and migrated");

    Ok(Arc::new(store))
}
