//! Generic document-store contract.
//!
//! Documents are JSON objects grouped by collection name. The store assigns an
//! opaque string id on insert and returns it inside every document under `id`.

use async_trait::async_trait;
use mediastore_core::AppError;
use serde_json::Value;
use thiserror::Error;

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document store backend error: {0}")]
    Backend(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Database(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// A single field condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    Ne(String, Value),
    /// Case-insensitive substring match on a string field.
    ContainsCi(String, String),
    /// String field starts with the given prefix.
    Prefix(String, String),
    /// Array field holds at least one of the given strings.
    ContainsAny(String, Vec<String>),
}

/// Conjunction of field conditions. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: &str) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn ne(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Ne(field.to_string(), value.into()));
        self
    }

    pub fn contains_ci(mut self, field: &str, needle: &str) -> Self {
        self.conditions
            .push(Condition::ContainsCi(field.to_string(), needle.to_string()));
        self
    }

    pub fn prefix(mut self, field: &str, prefix: &str) -> Self {
        self.conditions
            .push(Condition::Prefix(field.to_string(), prefix.to_string()));
        self
    }

    pub fn contains_any(mut self, field: &str, values: &[&str]) -> Self {
        self.conditions.push(Condition::ContainsAny(
            field.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    /// Evaluate the filter against a document held in memory.
    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => doc.get(field).unwrap_or(&Value::Null) == value,
            Condition::Ne(field, value) => doc.get(field).unwrap_or(&Value::Null) != value,
            Condition::ContainsCi(field, needle) => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
            Condition::Prefix(field, prefix) => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Condition::ContainsAny(field, values) => doc
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|item| values.iter().any(|v| v == item))
                }),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Paging and ordering for `find_many`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub offset: u64,
    pub limit: Option<u64>,
    pub sort: Option<(String, SortOrder)>,
}

impl FindOptions {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            offset: u64::from(page.saturating_sub(1)) * u64::from(limit),
            limit: Some(u64::from(limit)),
            sort: None,
        }
    }

    pub fn sorted_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some((field.to_string(), order));
        self
    }
}

/// Metadata persistence consumed by the engine.
///
/// Every failure is reported as a `StoreError`; success carries the data.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document and return its assigned id.
    async fn insert_one(&self, collection: &str, doc: Value) -> StoreResult<String>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>>;

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Value>>;

    /// Merge `patch`'s top-level fields into the document. Returns whether a
    /// document matched.
    async fn update_one(&self, collection: &str, id: &str, patch: Value) -> StoreResult<bool>;

    /// Returns whether a document was deleted.
    async fn delete_one(&self, collection: &str, id: &str) -> StoreResult<bool>;

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches() {
        let doc = json!({"id": "1", "filename": "Holiday-Photo.JPG", "status": "active", "path": "trips/a.jpg"});

        assert!(Filter::new().matches(&doc));
        assert!(Filter::by_id("1").matches(&doc));
        assert!(Filter::new().contains_ci("filename", "photo").matches(&doc));
        assert!(Filter::new().ne("status", "trashed").matches(&doc));
        assert!(!Filter::new().eq("status", "trashed").matches(&doc));
        assert!(Filter::new().prefix("path", "trips/").matches(&doc));
        assert!(Filter::new().ne("deletedAt", "x").matches(&doc));
    }

    #[test]
    fn test_contains_any_matches_array_members() {
        let doc = json!({"id": "1", "storedUrls": ["/files/a.png", "/files/sm/a.png"]});

        assert!(Filter::new()
            .contains_any("storedUrls", &["/files/x.png", "/files/sm/a.png"])
            .matches(&doc));
        assert!(!Filter::new().contains_any("storedUrls", &["/files/x.png"]).matches(&doc));
        assert!(!Filter::new().contains_any("missing", &["/files/a.png"]).matches(&doc));
    }

    #[test]
    fn test_find_options_page_offsets() {
        let options = FindOptions::page(3, 20);
        assert_eq!(options.offset, 40);
        assert_eq!(options.limit, Some(20));
    }
}
