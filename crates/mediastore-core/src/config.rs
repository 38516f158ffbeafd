//! Configuration module
//!
//! Environment-driven configuration for the storage backends, image processing,
//! ingestion limits, remote fetching and analytics.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::constants::{ORIGINAL_VARIANT, THUMBNAIL_VARIANT};
use crate::models::SizePreset;
use crate::storage_types::{StorageKind, TrashFailurePolicy};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MEDIA_FOLDER: &str = "media";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./public";
const DEFAULT_CDN_STORAGE_ENDPOINT: &str = "https://storage.bunnycdn.com";
const DEFAULT_IMAGE_SIZES: &str = "sm:600,md:900,lg:1200";
const DEFAULT_IMAGE_QUALITY: u8 = 80;
const DEFAULT_ALLOWED_MIME_PATTERN: &str = r"^(image|video|audio)/.+$|^application/pdf$";
const MAX_FILE_SIZE_MB: u64 = 50;
const CACHE_TTL_SECS: u64 = 300;
const CACHE_CAPACITY: usize = 1024;
const REMOTE_FETCH_TIMEOUT_SECS: u64 = 30;
const REMOTE_MAX_BYTES: u64 = 100 * 1024 * 1024;
const CLOUD_TIMEOUT_SECS: u64 = 60;
const STORAGE_QUOTA_BYTES: u64 = 10 * 1024 * 1024 * 1024;
const EFFICIENCY_THRESHOLD_BYTES: u64 = 1024 * 1024;

const OUTPUT_FORMATS: [&str; 6] = ["original", "jpeg", "jpg", "png", "webp", "avif"];

/// Process-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    /// Postgres connection string. Unset means the in-memory metadata store.
    pub database_url: Option<String>,
    pub log_format: String,
}

/// Storage backend settings.
///
/// `Debug` is implemented by hand so credentials never reach the logs.
#[derive(Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Key prefix applied by every backend.
    pub media_folder: String,
    pub local_root: PathBuf,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_public_url: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub cdn_storage_zone: Option<String>,
    pub cdn_storage_endpoint: String,
    pub cdn_public_url: Option<String>,
    pub cdn_access_key: Option<String>,
    pub cloud_timeout_secs: u64,
    pub trash_failure_policy: TrashFailurePolicy,
}

impl StorageConfig {
    /// Local backend rooted at `root` with the given media folder.
    pub fn local(root: impl Into<PathBuf>, media_folder: impl Into<String>) -> Self {
        Self {
            kind: StorageKind::Local,
            media_folder: media_folder.into(),
            local_root: root.into(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            s3_public_url: None,
            s3_access_key_id: None,
            s3_secret_access_key: None,
            cdn_storage_zone: None,
            cdn_storage_endpoint: DEFAULT_CDN_STORAGE_ENDPOINT.to_string(),
            cdn_public_url: None,
            cdn_access_key: None,
            cloud_timeout_secs: CLOUD_TIMEOUT_SECS,
            trash_failure_policy: TrashFailurePolicy::default(),
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        match self.kind {
            StorageKind::Local => {
                if self.local_root.as_os_str().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must not be empty when using local storage backend"
                    ));
                }
            }
            StorageKind::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageKind::Cdn => {
                if self.cdn_storage_zone.is_none() {
                    return Err(anyhow::anyhow!(
                        "CDN_STORAGE_ZONE must be set when using CDN storage backend"
                    ));
                }
                if self.cdn_public_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "CDN_PUBLIC_URL must be set when using CDN storage backend"
                    ));
                }
                if self.cdn_access_key.is_none() {
                    return Err(anyhow::anyhow!(
                        "CDN_ACCESS_KEY must be set when using CDN storage backend"
                    ));
                }
            }
        }
        Ok(())
    }
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "[REDACTED]"
    } else {
        "None"
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("kind", &self.kind)
            .field("media_folder", &self.media_folder)
            .field("local_root", &self.local_root)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_public_url", &self.s3_public_url)
            .field("s3_access_key_id", &redact(&self.s3_access_key_id))
            .field("s3_secret_access_key", &redact(&self.s3_secret_access_key))
            .field("cdn_storage_zone", &self.cdn_storage_zone)
            .field("cdn_storage_endpoint", &self.cdn_storage_endpoint)
            .field("cdn_public_url", &self.cdn_public_url)
            .field("cdn_access_key", &redact(&self.cdn_access_key))
            .field("cloud_timeout_secs", &self.cloud_timeout_secs)
            .field("trash_failure_policy", &self.trash_failure_policy)
            .finish()
    }
}

/// Variant generation settings
#[derive(Clone, Debug)]
pub struct ImageConfig {
    /// `original` keeps the source format.
    pub output_format: String,
    pub quality: u8,
    pub size_presets: Vec<SizePreset>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            output_format: "original".to_string(),
            quality: DEFAULT_IMAGE_QUALITY,
            size_presets: vec![
                SizePreset::new("sm", 600),
                SizePreset::new("md", 900),
                SizePreset::new("lg", 1200),
            ],
        }
    }
}

impl ImageConfig {
    fn validate(&self) -> Result<(), anyhow::Error> {
        if !(1..=100).contains(&self.quality) {
            return Err(anyhow::anyhow!("IMAGE_QUALITY must be between 1 and 100"));
        }
        if !OUTPUT_FORMATS.contains(&self.output_format.as_str()) {
            return Err(anyhow::anyhow!(
                "IMAGE_OUTPUT_FORMAT must be one of {}",
                OUTPUT_FORMATS.join(", ")
            ));
        }
        if self.size_presets.is_empty() {
            return Err(anyhow::anyhow!("IMAGE_SIZES must define at least one preset"));
        }
        for preset in &self.size_presets {
            if preset.name == ORIGINAL_VARIANT || preset.name == THUMBNAIL_VARIANT {
                return Err(anyhow::anyhow!(
                    "IMAGE_SIZES must not define the reserved preset name '{}'",
                    preset.name
                ));
            }
        }
        Ok(())
    }
}

/// Media engine configuration
#[derive(Clone, Debug)]
pub struct MediaStoreConfig {
    pub base: BaseConfig,
    pub storage: StorageConfig,
    pub image: ImageConfig,
    pub max_file_size_bytes: u64,
    pub allowed_mime_pattern: String,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub remote_fetch_timeout_secs: u64,
    pub remote_max_bytes: u64,
    /// Only these hosts may be fetched when set.
    pub remote_allowed_hosts: Option<Vec<String>>,
    pub archive_temp_dir: Option<PathBuf>,
    pub storage_quota_bytes: u64,
    pub efficiency_threshold_bytes: u64,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config(pub Box<MediaStoreConfig>);

impl Config {
    fn as_media(&self) -> &MediaStoreConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        matches!(
            self.as_media().base.environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        MediaStoreConfig::from_env().map(|c| Config(Box::new(c)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_media().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_media().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_media().base.environment
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_media().base.database_url.as_deref()
    }

    pub fn log_format(&self) -> &str {
        &self.as_media().base.log_format
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.as_media().storage
    }

    pub fn image(&self) -> &ImageConfig {
        &self.as_media().image
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.as_media().max_file_size_bytes
    }

    pub fn allowed_mime_pattern(&self) -> &str {
        &self.as_media().allowed_mime_pattern
    }

    pub fn cache_ttl_secs(&self) -> u64 {
        self.as_media().cache_ttl_secs
    }

    pub fn cache_capacity(&self) -> usize {
        self.as_media().cache_capacity
    }

    pub fn remote_fetch_timeout_secs(&self) -> u64 {
        self.as_media().remote_fetch_timeout_secs
    }

    pub fn remote_max_bytes(&self) -> u64 {
        self.as_media().remote_max_bytes
    }

    pub fn remote_allowed_hosts(&self) -> Option<&[String]> {
        self.as_media().remote_allowed_hosts.as_deref()
    }

    pub fn archive_temp_dir(&self) -> PathBuf {
        self.as_media()
            .archive_temp_dir
            .clone()
            .unwrap_or_else(env::temp_dir)
    }

    pub fn storage_quota_bytes(&self) -> u64 {
        self.as_media().storage_quota_bytes
    }

    pub fn efficiency_threshold_bytes(&self) -> u64 {
        self.as_media().efficiency_threshold_bytes
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl MediaStoreConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base = BaseConfig {
            server_port: match var("PORT") {
                Some(port) => port
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
                None => DEFAULT_PORT,
            },
            environment: var("ENVIRONMENT")
                .or_else(|| var("APP_ENV"))
                .unwrap_or_else(|| "development".to_string()),
            database_url: var("DATABASE_URL"),
            log_format: var("LOG_FORMAT")
                .unwrap_or_else(|| "pretty".to_string())
                .to_lowercase(),
        };

        let kind = match var("STORAGE_BACKEND") {
            Some(kind) => kind.parse::<StorageKind>()?,
            None => StorageKind::Local,
        };
        let trash_failure_policy = match var("TRASH_FAILURE_POLICY") {
            Some(policy) => policy.parse::<TrashFailurePolicy>()?,
            None => TrashFailurePolicy::default(),
        };

        let storage = StorageConfig {
            kind,
            media_folder: var("MEDIA_FOLDER")
                .unwrap_or_else(|| DEFAULT_MEDIA_FOLDER.to_string())
                .trim_matches('/')
                .to_string(),
            local_root: PathBuf::from(
                var("LOCAL_STORAGE_PATH").unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_PATH.to_string()),
            ),
            s3_bucket: var("S3_BUCKET"),
            s3_region: var("S3_REGION").or_else(|| var("AWS_REGION")),
            s3_endpoint: var("S3_ENDPOINT"),
            s3_public_url: var("S3_PUBLIC_URL"),
            s3_access_key_id: var("S3_ACCESS_KEY_ID"),
            s3_secret_access_key: var("S3_SECRET_ACCESS_KEY"),
            cdn_storage_zone: var("CDN_STORAGE_ZONE"),
            cdn_storage_endpoint: var("CDN_STORAGE_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_CDN_STORAGE_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            cdn_public_url: var("CDN_PUBLIC_URL"),
            cdn_access_key: var("CDN_ACCESS_KEY"),
            cloud_timeout_secs: parse_or(var("CLOUD_TIMEOUT_SECS"), CLOUD_TIMEOUT_SECS),
            trash_failure_policy,
        };

        let size_presets = SizePreset::parse_list(
            &var("IMAGE_SIZES").unwrap_or_else(|| DEFAULT_IMAGE_SIZES.to_string()),
        )
        .map_err(|e| anyhow::anyhow!("IMAGE_SIZES: {}", e))?;

        let image = ImageConfig {
            output_format: var("IMAGE_OUTPUT_FORMAT")
                .unwrap_or_else(|| "original".to_string())
                .to_lowercase(),
            quality: match var("IMAGE_QUALITY") {
                Some(q) => q
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("IMAGE_QUALITY must be between 1 and 100"))?,
                None => DEFAULT_IMAGE_QUALITY,
            },
            size_presets,
        };

        let config = MediaStoreConfig {
            base,
            storage,
            image,
            max_file_size_bytes: parse_or(var("MAX_FILE_SIZE_MB"), MAX_FILE_SIZE_MB) * 1024 * 1024,
            allowed_mime_pattern: var("ALLOWED_MIME_PATTERN")
                .unwrap_or_else(|| DEFAULT_ALLOWED_MIME_PATTERN.to_string()),
            cache_ttl_secs: parse_or(var("CACHE_TTL_SECS"), CACHE_TTL_SECS),
            cache_capacity: parse_or(var("CACHE_CAPACITY"), CACHE_CAPACITY),
            remote_fetch_timeout_secs: parse_or(
                var("REMOTE_FETCH_TIMEOUT_SECS"),
                REMOTE_FETCH_TIMEOUT_SECS,
            ),
            remote_max_bytes: parse_or(var("REMOTE_MAX_BYTES"), REMOTE_MAX_BYTES),
            remote_allowed_hosts: var("REMOTE_ALLOWED_HOSTS").map(|s| {
                s.split(',')
                    .map(|host| host.trim().to_lowercase())
                    .filter(|host| !host.is_empty())
                    .collect()
            }),
            archive_temp_dir: var("ARCHIVE_TEMP_DIR").map(PathBuf::from),
            storage_quota_bytes: parse_or(var("STORAGE_QUOTA_BYTES"), STORAGE_QUOTA_BYTES),
            efficiency_threshold_bytes: parse_or(
                var("EFFICIENCY_THRESHOLD_BYTES"),
                EFFICIENCY_THRESHOLD_BYTES,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.storage.validate()?;
        self.image.validate()?;

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.cache_capacity == 0 {
            return Err(anyhow::anyhow!("CACHE_CAPACITY must be greater than 0"));
        }

        regex::Regex::new(&self.allowed_mime_pattern)
            .map_err(|e| anyhow::anyhow!("ALLOWED_MIME_PATTERN is not a valid regex: {}", e))?;

        Ok(())
    }
}
