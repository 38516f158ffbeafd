//! Upload ingestion and the record operations built on it.
//!
//! An upload moves through validate, hash, store original, generate variants
//! (images only, best effort), persist record and populate cache. Storing the
//! original and persisting the record are fatal on failure; variant and cache
//! failures are logged and ignored.

use bytes::Bytes;
use chrono::Utc;
use mediastore_core::constants::{MAX_PAGE_LIMIT, ORIGINAL_VARIANT};
use mediastore_core::{
    AccessEntry, AppError, AppResult, Config, IngestedFile, MediaRecord, MediaType, Permission,
    SizePreset, Variant, VersionEntry,
};
use mediastore_db::{Cache, MediaQuery, MediaRepository, Page, PermissionEvaluator};
use mediastore_processing::hash::hash as content_hash;
use mediastore_processing::{sanitize_name, variant_path, VariantGenerator};
use mediastore_storage::Storage;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::access::AccessControl;
use crate::cache;
use crate::trash::{object_locations, trash_keys_held_by_others};

/// Fields that only the engine itself may change.
const IMMUTABLE_FIELDS: [&str; 11] = [
    "id",
    "hash",
    "type",
    "url",
    "variants",
    "owner",
    "access",
    "versions",
    "createdAt",
    "status",
    "deletedAt",
];

/// An upload as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResult {
    pub deleted: Vec<String>,
    pub not_found: Vec<String>,
}

struct StoredOriginal {
    hash: String,
    url: String,
    dimensions: Option<(u32, u32)>,
    variants: BTreeMap<String, Variant>,
}

/// Reject files whose mime type does not match `allowed_mime` or whose size
/// exceeds `max_size_bytes`.
pub fn validate(file: &UploadedFile, allowed_mime: &Regex, max_size_bytes: u64) -> AppResult<()> {
    if !allowed_mime.is_match(&file.mime_type) {
        return Err(AppError::InvalidInput(format!(
            "File type '{}' is not allowed",
            file.mime_type
        )));
    }
    let size = file.data.len() as u64;
    if size > max_size_bytes {
        return Err(AppError::InvalidInput(format!(
            "File size {} bytes exceeds the limit of {} bytes",
            size, max_size_bytes
        )));
    }
    Ok(())
}

fn require_id(id: &str) -> AppResult<()> {
    if id.trim().is_empty() {
        return Err(AppError::InvalidInput("Media id must not be empty".to_string()));
    }
    Ok(())
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Media {} not found", id))
}

fn display_name(filename: &str) -> &str {
    filename
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

fn logical_path(base_path: &str, filename: &str) -> String {
    let base_path = base_path.trim_matches('/');
    if base_path.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", base_path, filename)
    }
}

#[derive(Clone)]
pub struct MediaIngestionService {
    storage: Arc<dyn Storage>,
    repository: MediaRepository,
    cache: Arc<dyn Cache>,
    access: AccessControl,
    variants: Arc<VariantGenerator>,
    presets: Vec<SizePreset>,
    allowed_mime: Regex,
    max_file_size_bytes: u64,
    cache_ttl: Duration,
}

impl MediaIngestionService {
    pub fn new(
        storage: Arc<dyn Storage>,
        repository: MediaRepository,
        cache: Arc<dyn Cache>,
        evaluator: Arc<dyn PermissionEvaluator>,
        config: &Config,
    ) -> AppResult<Self> {
        let allowed_mime = Regex::new(config.allowed_mime_pattern())
            .map_err(|e| AppError::Internal(format!("Invalid mime pattern: {}", e)))?;
        let variants = VariantGenerator::from_config(storage.clone(), config.image())?;

        Ok(Self {
            storage,
            repository,
            cache,
            access: AccessControl::new(evaluator),
            variants: Arc::new(variants),
            presets: config.image().size_presets.clone(),
            allowed_mime,
            max_file_size_bytes: config.max_file_size_bytes(),
            cache_ttl: Duration::from_secs(config.cache_ttl_secs()),
        })
    }

    pub fn repository(&self) -> &MediaRepository {
        &self.repository
    }

    /// Ingest an upload under `base_path` on behalf of `owner`.
    ///
    /// Identical bytes uploaded twice produce two records sharing one hash.
    #[tracing::instrument(skip(self, file), fields(filename = %file.filename, size_bytes = file.data.len()))]
    pub async fn ingest(&self, file: UploadedFile, base_path: &str, owner: &str) -> AppResult<MediaRecord> {
        let start = Instant::now();
        validate(&file, &self.allowed_mime, self.max_file_size_bytes)?;
        let media_type = MediaType::from_mime(&file.mime_type)
            .ok_or_else(|| AppError::UnsupportedMediaType(file.mime_type.clone()))?;

        let stored = self.store_original(&file, base_path, media_type, start).await?;

        let filename = display_name(&file.filename).to_string();
        let ingested = IngestedFile {
            hash: stored.hash,
            media_type,
            path: logical_path(base_path, &filename),
            filename,
            url: stored.url,
            mime_type: file.mime_type.clone(),
            size: file.data.len() as u64,
            dimensions: stored.dimensions,
            variants: stored.variants,
            owner: owner.to_string(),
            ingested_at: Utc::now(),
        };

        let record = match self.repository.insert(&MediaRecord::from(ingested)).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    filename = %file.filename,
                    size_bytes = file.data.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    error = %e,
                    "Failed to persist media record"
                );
                return Err(e.into());
            }
        };

        cache::put_record(&*self.cache, self.repository.collection(), &record, self.cache_ttl).await;

        tracing::info!(
            media_id = record.id.as_deref().unwrap_or_default(),
            hash = %record.hash,
            media_type = %record.media_type,
            variant_count = record.variants.as_ref().map_or(0, BTreeMap::len),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Media ingested"
        );

        Ok(record)
    }

    async fn store_original(
        &self,
        file: &UploadedFile,
        base_path: &str,
        media_type: MediaType,
        start: Instant,
    ) -> AppResult<StoredOriginal> {
        let hash = content_hash(&file.data)?;
        let name = sanitize_name(&file.filename)?;
        let original_path = variant_path(base_path, ORIGINAL_VARIANT, &name.with_hash(&hash));

        let url = match self.storage.save(&file.data, &original_path).await {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(
                    filename = %file.filename,
                    size_bytes = file.data.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    error = %e,
                    "Failed to store original"
                );
                return Err(e.into());
            }
        };

        if media_type != MediaType::Image {
            return Ok(StoredOriginal {
                hash,
                url,
                dimensions: None,
                variants: BTreeMap::new(),
            });
        }

        let (dimensions, variants) = match self
            .variants
            .generate(&file.data, &hash, &name.base, &name.ext, base_path, &self.presets)
            .await
        {
            Ok(set) => (Some((set.source.width, set.source.height)), set.variants),
            Err(e) => {
                tracing::warn!(
                    filename = %file.filename,
                    error = %e,
                    "Variant generation failed, keeping original only"
                );
                (None, BTreeMap::new())
            }
        };

        Ok(StoredOriginal {
            hash,
            url,
            dimensions,
            variants,
        })
    }

    /// Fetch a record the caller is allowed to read. Checks the cache first.
    #[tracing::instrument(skip(self, user_roles))]
    pub async fn get_media(&self, id: &str, user_id: &str, user_roles: &[String]) -> AppResult<MediaRecord> {
        let record = self.find(id).await?;
        self.authorize(&record, user_id, user_roles, Permission::Read)
            .await?;
        Ok(record)
    }

    /// Fail with `AccessDenied` unless the caller holds `permission` on `record`.
    pub async fn authorize(
        &self,
        record: &MediaRecord,
        user_id: &str,
        user_roles: &[String],
        permission: Permission,
    ) -> AppResult<()> {
        if self
            .access
            .allows(record, user_id, user_roles, permission)
            .await
        {
            Ok(())
        } else {
            Err(AppError::AccessDenied(format!(
                "{} permission required on media {}",
                permission,
                record.id.as_deref().unwrap_or_default()
            )))
        }
    }

    async fn find(&self, id: &str) -> AppResult<MediaRecord> {
        require_id(id)?;
        let collection = self.repository.collection();
        if let Some(record) = cache::get_record(&*self.cache, &cache::record_key(collection, id)).await {
            return Ok(record);
        }

        let record = self.repository.get(id).await?.ok_or_else(|| not_found(id))?;
        cache::put_record(&*self.cache, collection, &record, self.cache_ttl).await;
        Ok(record)
    }

    async fn find_uncached(&self, id: &str) -> AppResult<MediaRecord> {
        require_id(id)?;
        self.repository.get(id).await?.ok_or_else(|| not_found(id))
    }

    async fn persist(&self, record: &MediaRecord) -> AppResult<()> {
        let id = record.id.as_deref().unwrap_or_default();
        if !self.repository.save(record).await? {
            return Err(not_found(id));
        }
        cache::invalidate(&*self.cache, self.repository.collection(), id).await;
        Ok(())
    }

    /// Merge `patch` into a record's metadata.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: Value) -> AppResult<MediaRecord> {
        require_id(id)?;
        let fields = match patch {
            Value::Object(fields) if !fields.is_empty() => fields,
            _ => {
                return Err(AppError::InvalidInput(
                    "Update body must be a non-empty object".to_string(),
                ))
            }
        };
        if let Some(field) = fields.keys().find(|k| IMMUTABLE_FIELDS.contains(&k.as_str())) {
            return Err(AppError::InvalidInput(format!("Field '{}' cannot be updated", field)));
        }

        let current = self.find_uncached(id).await?;
        let mut doc = serde_json::to_value(&current)?;
        if let Some(object) = doc.as_object_mut() {
            object.extend(fields);
            object.insert("updatedAt".to_string(), serde_json::to_value(Utc::now())?);
        }
        let updated: MediaRecord = serde_json::from_value(doc)
            .map_err(|e| AppError::InvalidInput(format!("Invalid update: {}", e)))?;

        self.persist(&updated).await?;
        Ok(updated)
    }

    /// Delete a record and, best effort, its original, variant and earlier
    /// version bytes. Bytes another record still references are kept.
    #[tracing::instrument(skip(self))]
    pub async fn delete_media(&self, id: &str) -> AppResult<()> {
        let record = self.find_uncached(id).await?;
        let owned = record.owned_urls();
        let in_use = self
            .repository
            .urls_shared_with_others(id, &owned, true)
            .await?;

        let mut keys: Vec<String> = owned
            .into_iter()
            .filter(|url| !in_use.contains(*url))
            .filter_map(|url| self.storage.key_from_url(url))
            .collect();
        if record.is_trashed() {
            let held = trash_keys_held_by_others(&*self.storage, &self.repository, &record).await?;
            keys.extend(
                object_locations(&*self.storage, &record)
                    .into_iter()
                    .filter(|object| !held.contains(&object.trash_key))
                    .map(|object| object.trash_key),
            );
        }
        self.delete_keys(id, &keys).await;

        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }
        cache::invalidate(&*self.cache, self.repository.collection(), id).await;

        tracing::info!(
            media_id = %id,
            removed_objects = keys.len(),
            "Media deleted"
        );
        Ok(())
    }

    async fn delete_keys(&self, id: &str, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(media_id = %id, key = %key, error = %e, "Failed to delete media bytes");
            }
        }
    }

    pub async fn bulk_delete(&self, ids: &[String]) -> AppResult<BulkDeleteResult> {
        if ids.is_empty() {
            return Err(AppError::InvalidInput("No media ids given".to_string()));
        }

        let mut result = BulkDeleteResult::default();
        for id in ids {
            match self.delete_media(id).await {
                Ok(()) => result.deleted.push(id.clone()),
                Err(AppError::NotFound(_)) => result.not_found.push(id.clone()),
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }

    /// Narrow `query` to what the caller may list. Roles granting
    /// `media:read` see every owner; anyone else sees only their own
    /// records.
    pub async fn scope_query(
        &self,
        mut query: MediaQuery,
        user_id: &str,
        user_roles: &[String],
    ) -> AppResult<MediaQuery> {
        if self.access.role_allows(user_roles, Permission::Read).await {
            return Ok(query);
        }
        match query.owner.as_deref() {
            Some(owner) if owner != user_id => Err(AppError::AccessDenied(format!(
                "{} permission required to list media of {}",
                Permission::Read,
                owner
            ))),
            _ => {
                query.owner = Some(user_id.to_string());
                Ok(query)
            }
        }
    }

    /// Page through non-trashed records. `limit` is capped at 100.
    pub async fn list(&self, query: &MediaQuery, page: u32, limit: u32) -> AppResult<Page<MediaRecord>> {
        if page < 1 {
            return Err(AppError::InvalidInput("page must be at least 1".to_string()));
        }
        if limit < 1 {
            return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
        }
        let limit = limit.min(MAX_PAGE_LIMIT);
        Ok(self.repository.list(query, page, limit).await?)
    }

    /// Case-insensitive filename search, narrowed by the rest of `query`.
    pub async fn search(&self, term: &str, query: MediaQuery, page: u32, limit: u32) -> AppResult<Page<MediaRecord>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::InvalidInput("Search term must not be empty".to_string()));
        }
        let query = MediaQuery {
            search: Some(term.to_string()),
            ..query
        };
        self.list(&query, page, limit).await
    }

    /// Store new bytes for an existing record and append a version entry.
    #[tracing::instrument(skip(self, file), fields(filename = %file.filename, size_bytes = file.data.len()))]
    pub async fn add_version(&self, id: &str, file: UploadedFile, user_id: &str) -> AppResult<MediaRecord> {
        let start = Instant::now();
        let mut record = self.find_uncached(id).await?;
        if record.is_trashed() {
            return Err(AppError::InvalidInput(format!(
                "Media {} is in the trash; restore it before adding a version",
                id
            )));
        }
        if record.media_type == MediaType::RemoteVideo {
            return Err(AppError::InvalidInput(
                "Remote media has no stored bytes to version".to_string(),
            ));
        }

        validate(&file, &self.allowed_mime, self.max_file_size_bytes)?;
        let media_type = MediaType::from_mime(&file.mime_type)
            .ok_or_else(|| AppError::UnsupportedMediaType(file.mime_type.clone()))?;
        if media_type != record.media_type {
            return Err(AppError::InvalidInput(format!(
                "A new version must be of type {}, got {}",
                record.media_type, media_type
            )));
        }

        let base_path = record.folder().to_string();
        let stored = self.store_original(&file, &base_path, media_type, start).await?;
        let now = Utc::now();
        let previous_variants: Vec<String> = record
            .variants
            .iter()
            .flat_map(|variants| variants.values().map(|v| v.url.clone()))
            .collect();

        record.versions.push(VersionEntry {
            version: record.next_version(),
            url: stored.url.clone(),
            created_at: now,
            created_by: user_id.to_string(),
        });
        record.hash = stored.hash;
        record.url = stored.url;
        record.mime_type = file.mime_type.clone();
        record.size = file.data.len() as u64;
        record.width = stored.dimensions.map(|(w, _)| w);
        record.height = stored.dimensions.map(|(_, h)| h);
        record.variants = (media_type == MediaType::Image).then_some(stored.variants);
        record.updated_at = Some(now);

        self.persist(&record).await?;

        // Earlier originals stay as version history; superseded variants go.
        let candidates: Vec<&str> = previous_variants.iter().map(String::as_str).collect();
        let in_use = self
            .repository
            .urls_shared_with_others(id, &candidates, true)
            .await?;
        let owned = record.owned_urls();
        let superseded: Vec<String> = previous_variants
            .iter()
            .filter(|url| !owned.contains(&url.as_str()) && !in_use.contains(*url))
            .filter_map(|url| self.storage.key_from_url(url))
            .collect();
        self.delete_keys(id, &superseded).await;

        tracing::info!(
            media_id = %id,
            version = record.next_version() - 1,
            superseded_variants = superseded.len(),
            "Media version added"
        );
        Ok(record)
    }

    /// Replace the access list. The owner's full entry is always kept.
    pub async fn update_access(&self, id: &str, entries: Vec<AccessEntry>) -> AppResult<MediaRecord> {
        let mut record = self.find_uncached(id).await?;
        record.set_access(entries);
        record.updated_at = Some(Utc::now());
        self.persist(&record).await?;
        Ok(record)
    }
}
