//! Soft delete: move bytes into the trash area and flag the record.

use chrono::Utc;
use mediastore_core::{AppError, AppResult, MediaRecord, MediaStatus, TrashFailurePolicy};
use mediastore_db::{Cache, MediaRepository};
use mediastore_storage::{keys, Storage};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashOutcome {
    /// Trash-relative path of the moved original. `None` when the move failed
    /// and the policy chose to continue, or when another active record still
    /// uses the bytes.
    pub trash_path: Option<String>,
    /// The flagged record, if one matched.
    pub record: Option<MediaRecord>,
}

/// One stored object of a record and its place in the trash.
pub(crate) struct ObjectLocation {
    pub url: String,
    pub key: String,
    pub trash_key: String,
    pub original: bool,
}

/// The current original and variants of `record`, original first. URLs the
/// backend does not serve are left out.
pub(crate) fn object_locations(storage: &dyn Storage, record: &MediaRecord) -> Vec<ObjectLocation> {
    let original = std::iter::once((record.url.as_str(), true));
    let variants = record
        .variants
        .iter()
        .flat_map(|variants| variants.values())
        .map(|v| (v.url.as_str(), false));

    original
        .chain(variants)
        .filter_map(|(url, original)| {
            let key = storage.key_from_url(url)?;
            let trash_key = if original {
                keys::trash_path(&key)
            } else {
                keys::nested_trash_path(&key)
            };
            Some(ObjectLocation {
                url: url.to_string(),
                key,
                trash_key,
                original,
            })
        })
        .collect()
}

/// Trash keys of `record` that another trashed record occupies as well.
///
/// Trash keys drop the folder, so identical uploads in different folders
/// land on the same key. Basenames carry the content hash, so only records
/// with the same hash can collide.
pub(crate) async fn trash_keys_held_by_others(
    storage: &dyn Storage,
    repository: &MediaRepository,
    record: &MediaRecord,
) -> AppResult<HashSet<String>> {
    let id = record.id.as_deref().unwrap_or_default();
    Ok(repository
        .trashed_with_hash(&record.hash, id)
        .await?
        .iter()
        .flat_map(|other| object_locations(storage, other))
        .map(|object| object.trash_key)
        .collect())
}

#[derive(Clone)]
pub struct TrashManager {
    storage: Arc<dyn Storage>,
    repository: MediaRepository,
    cache: Arc<dyn Cache>,
    policy: TrashFailurePolicy,
}

impl TrashManager {
    pub fn new(
        storage: Arc<dyn Storage>,
        repository: MediaRepository,
        cache: Arc<dyn Cache>,
        policy: TrashFailurePolicy,
    ) -> Self {
        Self {
            storage,
            repository,
            cache,
            policy,
        }
    }

    fn repository_for(&self, collection_hint: Option<&str>) -> MediaRepository {
        match collection_hint.map(str::trim).filter(|c| !c.is_empty()) {
            Some(collection) => self.repository.for_collection(collection),
            None => self.repository.clone(),
        }
    }

    /// Move the original at `key` into the trash. Whether a failure aborts
    /// depends on the configured [`TrashFailurePolicy`] and the backend kind.
    async fn trash_original(&self, key: &str) -> AppResult<Option<String>> {
        match self.storage.move_to_trash(key).await {
            Ok(path) => Ok(Some(path)),
            Err(e) if self.policy.propagates(self.storage.kind()) => {
                tracing::error!(key = %key, backend = %self.storage.kind(), error = %e, "Failed to move object to trash");
                Err(e.into())
            }
            Err(e) => {
                tracing::warn!(key = %key, backend = %self.storage.kind(), error = %e, "Failed to move object to trash, flagging record anyway");
                Ok(None)
            }
        }
    }

    /// Move the object behind `url` into the trash and mark the active record
    /// stored there, if any.
    #[tracing::instrument(skip(self))]
    pub async fn move_to_trash(&self, url: &str, collection_hint: Option<&str>) -> AppResult<TrashOutcome> {
        let key = self
            .storage
            .key_from_url(url)
            .ok_or_else(|| AppError::InvalidArgument(format!("URL is not served by this backend: {}", url)))?;

        let repository = self.repository_for(collection_hint);
        if let Some(record) = repository.find_active_by_url(url).await? {
            return self.trash_record(&repository, record).await;
        }

        let trash_path = self.trash_original(&key).await?;
        tracing::info!(
            key = %key,
            trash_path = trash_path.as_deref().unwrap_or_default(),
            record_found = false,
            "Media moved to trash"
        );
        Ok(TrashOutcome {
            trash_path,
            record: None,
        })
    }

    /// Trash exactly the record `id`, with its original and variants.
    #[tracing::instrument(skip(self))]
    pub async fn move_record_to_trash(&self, id: &str, collection_hint: Option<&str>) -> AppResult<TrashOutcome> {
        let repository = self.repository_for(collection_hint);
        let record = repository
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media {} not found", id)))?;
        if record.is_trashed() {
            return Err(AppError::InvalidInput(format!("Media {} is already in the trash", id)));
        }
        self.trash_record(&repository, record).await
    }

    async fn trash_record(&self, repository: &MediaRepository, mut record: MediaRecord) -> AppResult<TrashOutcome> {
        let id = record.id.clone().unwrap_or_default();
        let locations = object_locations(&*self.storage, &record);
        let urls: Vec<&str> = locations.iter().map(|object| object.url.as_str()).collect();
        let in_use = repository.urls_shared_with_others(&id, &urls, false).await?;

        let mut trash_path = None;
        for object in locations {
            if in_use.contains(&object.url) {
                tracing::debug!(media_id = %id, key = %object.key, "Bytes shared with an active record, leaving them in place");
                continue;
            }
            if object.original {
                trash_path = self.trash_original(&object.key).await?;
            } else if let Err(e) = self.storage.relocate(&object.key, &object.trash_key).await {
                tracing::warn!(media_id = %id, key = %object.key, error = %e, "Failed to move variant to trash");
            }
        }

        let now = Utc::now();
        repository
            .mark_status(&id, MediaStatus::Trashed, Some(now))
            .await?;
        cache::invalidate(&*self.cache, repository.collection(), &id).await;
        record.status = MediaStatus::Trashed;
        record.deleted_at = Some(now);
        record.updated_at = Some(now);

        tracing::info!(
            media_id = %id,
            trash_path = trash_path.as_deref().unwrap_or_default(),
            record_found = true,
            "Media moved to trash"
        );
        Ok(TrashOutcome {
            trash_path,
            record: Some(record),
        })
    }

    /// Move a trashed record's bytes back and mark it active again.
    ///
    /// Objects still at their original key (a swallowed trash failure, or
    /// bytes left for another record) need no move.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self, id: &str, collection_hint: Option<&str>) -> AppResult<MediaRecord> {
        let repository = self.repository_for(collection_hint);
        let mut record = repository
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media {} not found", id)))?;
        if !record.is_trashed() {
            return Err(AppError::InvalidInput(format!("Media {} is not in the trash", id)));
        }
        if self.storage.key_from_url(&record.url).is_none() {
            return Err(AppError::InvalidArgument(format!(
                "URL is not served by this backend: {}",
                record.url
            )));
        }

        // A trash key another trashed record still needs is copied out, not moved.
        let held = trash_keys_held_by_others(&*self.storage, &repository, &record).await?;
        for object in object_locations(&*self.storage, &record) {
            if self.storage.exists(&object.trash_key).await? {
                let moved = if held.contains(&object.trash_key) {
                    self.storage.copy(&object.trash_key, &object.key).await
                } else {
                    self.storage.relocate(&object.trash_key, &object.key).await
                };
                match moved {
                    Ok(_) => {}
                    Err(e) if object.original => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(media_id = %id, key = %object.key, error = %e, "Failed to restore variant")
                    }
                }
            } else if !self.storage.exists(&object.key).await? {
                if object.original {
                    return Err(AppError::NotFound(format!(
                        "Bytes of media {} are neither in the trash nor in place",
                        id
                    )));
                }
                tracing::warn!(media_id = %id, key = %object.key, "Variant missing from trash");
            }
        }

        record.status = MediaStatus::Active;
        record.deleted_at = None;
        record.updated_at = Some(Utc::now());
        repository.save(&record).await?;
        cache::invalidate(&*self.cache, repository.collection(), id).await;

        tracing::info!(media_id = %id, "Media restored from trash");
        Ok(record)
    }
}
