//! Mediastore Services Layer
//!
//! Orchestration over storage, processing and metadata persistence: upload
//! ingestion, trash lifecycle, remote media fetching, archive export and
//! storage analytics. HTTP handling stays in mediastore-api.

pub mod access;
pub mod analytics;
pub mod archive;
mod cache;
pub mod ingest;
pub mod remote;
pub mod trash;

pub use access::AccessControl;
pub use analytics::{
    analyze_storage, build_report, calculate_quota_usage, calculate_trends, generate_insights,
    predict_storage, AnalyticsSettings, StorageAnalytics, StorageReport,
};
pub use archive::{ArchiveExporter, ArchiveStream, ExportedArchive};
pub use ingest::{BulkDeleteResult, MediaIngestionService, UploadedFile};
pub use remote::{FetchError, RemoteIngest, RemoteMediaFetcher};
pub use trash::{TrashManager, TrashOutcome};
