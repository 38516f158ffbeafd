//! Record caching helpers. The cache is never authoritative: every failure here
//! is logged and ignored.

use mediastore_core::MediaRecord;
use mediastore_db::Cache;
use std::time::Duration;

pub(crate) fn record_key(collection: &str, id: &str) -> String {
    format!("{}:{}", collection, id)
}

pub(crate) async fn get_record(cache: &dyn Cache, key: &str) -> Option<MediaRecord> {
    match cache.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring undecodable cache entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cache read failed");
            None
        }
    }
}

pub(crate) async fn put_record(cache: &dyn Cache, collection: &str, record: &MediaRecord, ttl: Duration) {
    let Some(id) = record.id.as_deref() else {
        return;
    };
    let key = record_key(collection, id);
    let value = match serde_json::to_value(record) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to serialize record for cache");
            return;
        }
    };
    if let Err(e) = cache.set(&key, value, ttl).await {
        tracing::warn!(key = %key, error = %e, "Cache write failed");
    }
}

pub(crate) async fn invalidate(cache: &dyn Cache, collection: &str, id: &str) {
    let key = record_key(collection, id);
    if let Err(e) = cache.delete(&key).await {
        tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
    }
}
