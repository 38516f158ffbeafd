//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::auth::{SessionValidator, StaticSessionValidator};
use crate::state::{AppState, Collaborators};
use anyhow::{Context, Result};
use mediastore_core::Config;
use mediastore_db::{MemoryCache, PermissionEvaluator, RolePermissionEvaluator};
use std::sync::Arc;

/// Role table used when no external permission service is wired in.
pub fn default_permissions() -> RolePermissionEvaluator {
    RolePermissionEvaluator::new()
        .grant("admin", "*")
        .grant("editor", "media:*")
        .grant("viewer", "media:read")
}

fn setup_sessions() -> Result<Arc<dyn SessionValidator>> {
    let validator = match std::env::var("API_TOKENS") {
        Ok(spec) => StaticSessionValidator::parse(&spec).context("Invalid API_TOKENS")?,
        Err(_) => StaticSessionValidator::new(),
    };
    if validator.is_empty() {
        tracing::warn!("API_TOKENS is empty, every authenticated endpoint will reject requests");
    } else {
        tracing::info!(sessions = validator.len(), "Static sessions loaded");
    }
    Ok(Arc::new(validator))
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(AppState, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    let (storage, public_root) = storage::setup_storage(&config).await?;
    let store = database::setup_document_store(&config).await?;
    let evaluator: Arc<dyn PermissionEvaluator> = Arc::new(default_permissions());
    let cache = Arc::new(MemoryCache::with_capacity(config.cache_capacity()));

    let state = AppState::new(
        config,
        Collaborators {
            storage,
            store,
            cache,
            evaluator,
            sessions: setup_sessions()?,
            public_root,
        },
    )
    .map_err(|e| anyhow::anyhow!("Failed to build services: {}", e))?;

    let router = routes::setup_routes(state.clone())?;
    Ok((state, router))
}
