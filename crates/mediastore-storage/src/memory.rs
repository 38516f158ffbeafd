//! In-memory storage used as a fake across the workspace's tests.

use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use mediastore_core::constants::LOCAL_PUBLIC_ROUTE;
use mediastore_core::StorageKind;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const MEMORY_PUBLIC_URL: &str = "https://memory.example.com";

/// Storage that keeps objects in a map keyed by the full prefixed key.
///
/// URLs follow the local layout for [`StorageKind::Local`] and a cloud-style
/// public base otherwise. Saves whose relative path contains a configured
/// marker, and deletes when enabled, can be made to fail.
#[derive(Clone)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    kind: StorageKind,
    prefix: String,
    fail_saves_containing: Arc<Mutex<Option<String>>>,
    fail_deletes: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new(prefix: &str) -> Self {
        Self::with_kind(StorageKind::Local, prefix)
    }

    pub fn with_kind(kind: StorageKind, prefix: &str) -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            kind,
            prefix: keys::normalize_prefix(prefix),
            fail_saves_containing: Arc::new(Mutex::new(None)),
            fail_deletes: Arc::new(AtomicBool::new(false)),
        }
    }

    fn files(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every save whose relative path contains `marker` fail.
    pub fn fail_saves_containing(&self, marker: &str) {
        *self
            .fail_saves_containing
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(marker.to_string());
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Whether a full (prefixed) key is present.
    pub fn has_key(&self, key: &str) -> bool {
        self.files().contains_key(key)
    }

    /// All stored full keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.files().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn full_key(&self, relative_path: &str) -> StorageResult<(String, String)> {
        let relative = keys::normalize(relative_path)?;
        let key = keys::prefixed(&self.prefix, &relative);
        Ok((relative, key))
    }

    fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            Some(path)
        } else {
            path.strip_prefix(&self.prefix)?.strip_prefix('/')
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(&self, data: &[u8], relative_path: &str) -> StorageResult<String> {
        let (relative, key) = self.full_key(relative_path)?;
        let should_fail = self
            .fail_saves_containing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|marker| relative.contains(marker.as_str()));
        if should_fail {
            return Err(StorageError::UploadFailed(format!(
                "Injected save failure for {}",
                relative
            )));
        }
        self.files().insert(key, data.to_vec());
        Ok(self.resolve_url(&relative))
    }

    async fn read(&self, relative_path: &str) -> StorageResult<Vec<u8>> {
        let (relative, key) = self.full_key(relative_path)?;
        self.files()
            .get(&key)
            .cloned()
            .ok_or(StorageError::NotFound(relative))
    }

    async fn exists(&self, relative_path: &str) -> StorageResult<bool> {
        let (_, key) = self.full_key(relative_path)?;
        Ok(self.files().contains_key(&key))
    }

    async fn content_length(&self, relative_path: &str) -> StorageResult<u64> {
        let (relative, key) = self.full_key(relative_path)?;
        self.files()
            .get(&key)
            .map(|data| data.len() as u64)
            .ok_or(StorageError::NotFound(relative))
    }

    async fn delete(&self, relative_path: &str) -> StorageResult<()> {
        let (relative, key) = self.full_key(relative_path)?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(format!(
                "Injected delete failure for {}",
                relative
            )));
        }
        self.files().remove(&key);
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<String> {
        let (from_relative, from_key) = self.full_key(from)?;
        let (to_relative, to_key) = self.full_key(to)?;
        let mut files = self.files();
        let data = files
            .get(&from_key)
            .cloned()
            .ok_or(StorageError::NotFound(from_relative))?;
        files.insert(to_key, data);
        drop(files);
        Ok(self.resolve_url(&to_relative))
    }

    fn resolve_url(&self, relative_path: &str) -> String {
        let relative = relative_path.trim_start_matches('/');
        match self.kind {
            StorageKind::Local => format!("{}/{}", LOCAL_PUBLIC_ROUTE, relative),
            _ => format!(
                "{}/{}",
                MEMORY_PUBLIC_URL,
                keys::prefixed(&self.prefix, relative)
            ),
        }
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        let relative = match self.kind {
            StorageKind::Local => keys::url_path(url)
                .strip_prefix(LOCAL_PUBLIC_ROUTE)?
                .strip_prefix('/')?,
            _ => self.strip_prefix(url.strip_prefix(MEMORY_PUBLIC_URL)?.strip_prefix('/')?)?,
        };
        keys::normalize(relative).ok()
    }

    fn kind(&self) -> StorageKind {
        self.kind
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }
}
