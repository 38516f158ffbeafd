//! Mediastore Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every mediastore component: storage backends, processing, services and the API.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ImageConfig, MediaStoreConfig, StorageConfig};
pub use error::{AppError, AppResult, ErrorMetadata, LogLevel};
pub use models::{
    AccessEntry, IngestedFile, MediaRecord, MediaStatus, MediaType, Permission, RemoteAsset,
    SizePreset, SubjectKind, Variant, VersionEntry,
};
pub use storage_types::{StorageKind, TrashFailurePolicy};
