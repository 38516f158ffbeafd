//! Constants shared across crates.

/// Public route prefix under which the local backend's files are served.
pub const LOCAL_PUBLIC_ROUTE: &str = "/files";

/// Name of the soft-delete area, relative to the configured media folder.
pub const TRASH_DIR: &str = ".trash";

/// Length of the truncated content hash (hex characters).
pub const HASH_LENGTH: usize = 32;

/// Reserved variant key for the fixed square thumbnail.
pub const THUMBNAIL_VARIANT: &str = "thumbnail";

/// Edge length of the fixed square thumbnail in pixels.
pub const THUMBNAIL_SIZE: u32 = 200;

/// Name reserved for the original file. Never used as a variant key.
pub const ORIGINAL_VARIANT: &str = "original";

/// Default metadata collection for ingested media.
pub const MEDIA_COLLECTION: &str = "media";

/// Default metadata collection for remote (fetched) media.
pub const REMOTE_MEDIA_COLLECTION: &str = "remote-media";

/// Maximum page size accepted by list/search.
pub const MAX_PAGE_LIMIT: u32 = 100;
