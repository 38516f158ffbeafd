use crate::auth::SessionValidator;
use mediastore_core::constants::MEDIA_COLLECTION;
use mediastore_core::{AppResult, Config};
use mediastore_db::{Cache, DocumentStore, MediaRepository, PermissionEvaluator};
use mediastore_services::{
    AnalyticsSettings, ArchiveExporter, MediaIngestionService, RemoteMediaFetcher,
    StorageAnalytics, TrashManager,
};
use mediastore_storage::Storage;
use std::path::PathBuf;
use std::sync::Arc;

/// Collaborators injected into the application state.
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<dyn Cache>,
    pub evaluator: Arc<dyn PermissionEvaluator>,
    pub sessions: Arc<dyn SessionValidator>,
    /// Directory served under `/files`, local backend only.
    pub public_root: Option<PathBuf>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn Storage>,
    pub ingestion: MediaIngestionService,
    pub trash: TrashManager,
    pub remote: RemoteMediaFetcher,
    pub exporter: ArchiveExporter,
    pub analytics: StorageAnalytics,
    pub sessions: Arc<dyn SessionValidator>,
    pub public_root: Option<PathBuf>,
}

impl AppState {
    pub fn new(config: Config, deps: Collaborators) -> AppResult<Self> {
        let repository = MediaRepository::new(deps.store, MEDIA_COLLECTION);

        let ingestion = MediaIngestionService::new(
            deps.storage.clone(),
            repository.clone(),
            deps.cache.clone(),
            deps.evaluator,
            &config,
        )?;
        let trash = TrashManager::new(
            deps.storage.clone(),
            repository.clone(),
            deps.cache.clone(),
            config.storage().trash_failure_policy,
        );
        let remote = RemoteMediaFetcher::new(&repository, deps.cache, &config)?;
        let exporter =
            ArchiveExporter::new(deps.storage.clone(), repository.clone(), config.archive_temp_dir());
        let analytics = StorageAnalytics::new(repository, AnalyticsSettings::from_config(&config));

        Ok(Self {
            config: Arc::new(config),
            storage: deps.storage,
            ingestion,
            trash,
            remote,
            exporter,
            analytics,
            sessions: deps.sessions,
            public_root: deps.public_root,
        })
    }
}
