//! Mediastore metadata persistence
//!
//! Contracts for the collaborators the engine consumes (document store, cache,
//! permission evaluator), their in-memory implementations, a Postgres JSONB
//! document store behind the `postgres` feature, and the typed
//! [`MediaRepository`].

pub mod cache;
pub mod document;
pub mod memory;
pub mod permission;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod repository;

pub use cache::{Cache, CacheError, CacheResult, MemoryCache};
pub use document::{
    Condition, DocumentStore, Filter, FindOptions, SortOrder, StoreError, StoreResult,
};
pub use memory::MemoryDocumentStore;
pub use permission::{PermissionEvaluator, RolePermissionEvaluator};
#[cfg(feature = "postgres")]
pub use postgres::PgDocumentStore;
pub use repository::{MediaQuery, MediaRepository, Page};
