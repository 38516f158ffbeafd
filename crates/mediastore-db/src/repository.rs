//! Typed media repository over any [`DocumentStore`].

use mediastore_core::{MediaRecord, MediaStatus, MediaType};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::document::{DocumentStore, Filter, FindOptions, SortOrder, StoreError, StoreResult};

/// One page of results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Listing criteria. Trashed records are always excluded.
#[derive(Debug, Clone, Default)]
pub struct MediaQuery {
    pub search: Option<String>,
    pub media_type: Option<MediaType>,
    pub folder: Option<String>,
    pub owner: Option<String>,
}

impl MediaQuery {
    fn to_filter(&self) -> Filter {
        let mut filter = Filter::new().ne("status", "trashed");
        if let Some(ref search) = self.search {
            filter = filter.contains_ci("filename", search);
        }
        if let Some(media_type) = self.media_type {
            filter = filter.eq("type", media_type.as_str());
        }
        if let Some(ref folder) = self.folder {
            let folder = folder.trim_matches('/');
            if !folder.is_empty() {
                filter = filter.prefix("path", &format!("{}/", folder));
            }
        }
        if let Some(ref owner) = self.owner {
            filter = filter.eq("owner", owner.as_str());
        }
        filter
    }
}

/// Media records stored in one named collection
#[derive(Clone)]
pub struct MediaRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

/// Optional fields omitted from serialized records when unset. A full save
/// writes them as `null` so a merge clears previous values.
const OPTIONAL_FIELDS: [&str; 7] = [
    "width",
    "height",
    "variants",
    "updatedAt",
    "deletedAt",
    "provider",
    "externalId",
];

/// Every URL a record owns (original, variants, version history), kept on the
/// document so shared-bytes checks can query for it.
const STORED_URLS_FIELD: &str = "storedUrls";

fn encode(record: &MediaRecord) -> StoreResult<Value> {
    let mut doc = serde_json::to_value(record)?;
    if let Some(object) = doc.as_object_mut() {
        object.insert(
            STORED_URLS_FIELD.to_string(),
            serde_json::to_value(record.owned_urls())?,
        );
    }
    Ok(doc)
}

fn decode(doc: Value) -> StoreResult<MediaRecord> {
    serde_json::from_value(doc).map_err(StoreError::from)
}

impl MediaRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Same store, another collection.
    pub fn for_collection(&self, collection: &str) -> Self {
        Self::new(self.store.clone(), collection)
    }

    /// Insert a new record and return it with its assigned id.
    pub async fn insert(&self, record: &MediaRecord) -> StoreResult<MediaRecord> {
        let doc = encode(record)?;
        let id = self.store.insert_one(&self.collection, doc).await?;
        let mut stored = record.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<MediaRecord>> {
        self.find_one(&Filter::by_id(id)).await
    }

    pub async fn find_by_hash(&self, hash: &str) -> StoreResult<Option<MediaRecord>> {
        self.find_one(&Filter::new().eq("hash", hash)).await
    }

    pub async fn find_by_url(&self, url: &str) -> StoreResult<Option<MediaRecord>> {
        self.find_one(&Filter::new().eq("url", url)).await
    }

    /// The non-trashed record stored at `url`, if any.
    pub async fn find_active_by_url(&self, url: &str) -> StoreResult<Option<MediaRecord>> {
        self.find_one(&Filter::new().eq("url", url).ne("status", "trashed"))
            .await
    }

    /// Which of `urls` a record other than `excluding_id` still owns.
    /// Trashed records are counted only when `include_trashed` is set.
    ///
    /// Identical uploads share stored bytes, so bytes may only be removed or
    /// moved once no other record references them.
    pub async fn urls_shared_with_others(
        &self,
        excluding_id: &str,
        urls: &[&str],
        include_trashed: bool,
    ) -> StoreResult<HashSet<String>> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }
        let mut filter = Filter::new()
            .ne("id", excluding_id)
            .contains_any(STORED_URLS_FIELD, urls);
        if !include_trashed {
            filter = filter.ne("status", "trashed");
        }

        let mut shared = HashSet::new();
        for doc in self
            .store
            .find_many(&self.collection, &filter, &FindOptions::default())
            .await?
        {
            let Some(stored) = doc.get(STORED_URLS_FIELD).and_then(Value::as_array) else {
                continue;
            };
            shared.extend(
                stored
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|url| urls.contains(url))
                    .map(str::to_string),
            );
        }
        Ok(shared)
    }

    /// Trashed records other than `excluding_id` holding content `hash`.
    pub async fn trashed_with_hash(
        &self,
        hash: &str,
        excluding_id: &str,
    ) -> StoreResult<Vec<MediaRecord>> {
        let filter = Filter::new()
            .eq("hash", hash)
            .eq("status", "trashed")
            .ne("id", excluding_id);
        self.store
            .find_many(&self.collection, &filter, &FindOptions::default())
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<MediaRecord>> {
        self.store
            .find_one(&self.collection, filter)
            .await?
            .map(decode)
            .transpose()
    }

    /// Merge a JSON patch into a record. Returns whether it existed.
    pub async fn update(&self, id: &str, patch: Value) -> StoreResult<bool> {
        self.store.update_one(&self.collection, id, patch).await
    }

    /// Persist every field of an existing record.
    pub async fn save(&self, record: &MediaRecord) -> StoreResult<bool> {
        let id = record
            .id
            .as_deref()
            .ok_or_else(|| StoreError::InvalidDocument("record has no id".into()))?;
        let mut doc = encode(record)?;
        if let Some(object) = doc.as_object_mut() {
            for field in OPTIONAL_FIELDS {
                object.entry(field).or_insert(Value::Null);
            }
        }
        self.store.update_one(&self.collection, id, doc).await
    }

    pub async fn mark_status(
        &self,
        id: &str,
        status: MediaStatus,
        deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> StoreResult<bool> {
        let patch = serde_json::json!({
            "status": status,
            "deletedAt": deleted_at,
            "updatedAt": chrono::Utc::now(),
        });
        self.update(id, patch).await
    }

    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.store.delete_one(&self.collection, id).await
    }

    /// Page through non-trashed records, newest first.
    pub async fn list(
        &self,
        query: &MediaQuery,
        page: u32,
        limit: u32,
    ) -> StoreResult<Page<MediaRecord>> {
        let filter = query.to_filter();
        let total = self.store.count(&self.collection, &filter).await?;
        let options = FindOptions::page(page, limit).sorted_by("createdAt", SortOrder::Desc);
        let items = self
            .store
            .find_many(&self.collection, &filter, &options)
            .await?
            .into_iter()
            .map(decode)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total, page, limit))
    }

    /// Every record in the collection, trashed ones included.
    pub async fn all(&self) -> StoreResult<Vec<MediaRecord>> {
        self.store
            .find_many(&self.collection, &Filter::new(), &FindOptions::default())
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}
