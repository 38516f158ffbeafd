//! Mediastore Storage Library
//!
//! Storage abstraction and backends: local filesystem, S3-compatible object
//! storage and a CDN media service, plus an in-memory backend for tests.
//!
//! # Key layout
//!
//! Callers pass paths relative to the configured media folder. Every backend
//! normalizes them (no leading slash, no `..`) and stores the object at
//! `<media folder>/<relative path>`. Local URLs are `/files/<relative path>`;
//! cloud URLs join the public base URL with the full prefixed key.

pub mod cdn;
pub mod factory;
pub mod keys;
pub mod local;
pub mod memory;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use cdn::CdnStorage;
pub use factory::{create_storage, StorageBackend};
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
