//! Ingestion of external media by reference.
//!
//! The body is fetched only to compute its hash. A record with the same hash
//! in the target collection short-circuits the insert, so fetching the same
//! asset twice yields one record.

use chrono::Utc;
use mediastore_core::constants::REMOTE_MEDIA_COLLECTION;
use mediastore_core::{AppError, AppResult, Config, MediaRecord, RemoteAsset};
use mediastore_db::{Cache, MediaRepository};
use mediastore_processing::hash::hash as content_hash;
use reqwest::{header, Client, Url};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::cache;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    #[error("Remote server returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Remote body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(_) | FetchError::HostNotAllowed(_) => {
                AppError::InvalidInput(err.to_string())
            }
            FetchError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            FetchError::Status { .. } | FetchError::Request(_) => AppError::Fetch(err.to_string()),
        }
    }
}

/// Result of a remote ingestion.
#[derive(Debug, Clone)]
pub struct RemoteIngest {
    pub id: String,
    pub record: MediaRecord,
    /// True when an existing record with the same hash was returned.
    pub deduplicated: bool,
}

struct Fetched {
    body: Vec<u8>,
    mime_type: String,
}

#[derive(Clone)]
pub struct RemoteMediaFetcher {
    client: Client,
    repository: MediaRepository,
    cache: Arc<dyn Cache>,
    max_bytes: u64,
    allowed_hosts: Option<Vec<String>>,
    cache_ttl: Duration,
}

impl RemoteMediaFetcher {
    /// `repository` may point at any collection; remote records default to
    /// the remote-media collection of the same store.
    pub fn new(repository: &MediaRepository, cache: Arc<dyn Cache>, config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.remote_fetch_timeout_secs()))
            .build()
            .map_err(FetchError::from)?;

        Ok(Self {
            client,
            repository: repository.for_collection(REMOTE_MEDIA_COLLECTION),
            cache,
            max_bytes: config.remote_max_bytes(),
            allowed_hosts: config.remote_allowed_hosts().map(<[String]>::to_vec),
            cache_ttl: Duration::from_secs(config.cache_ttl_secs()),
        })
    }

    fn parse_source(&self, source_url: &str) -> Result<(Url, String), FetchError> {
        let url = Url::parse(source_url.trim())
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", source_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(format!("{} has no host", source_url)))?
            .to_lowercase();

        if let Some(ref allowed) = self.allowed_hosts {
            if !allowed.iter().any(|h| h == &host) {
                return Err(FetchError::HostNotAllowed(host));
            }
        }
        Ok((url, host))
    }

    async fn fetch(&self, url: &Url) -> Result<Fetched, FetchError> {
        let mut response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Fetched { body, mime_type })
    }

    /// Fetch `source_url` and persist it as a remote record owned by `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn ingest_remote(
        &self,
        source_url: &str,
        collection_hint: Option<&str>,
        user_id: &str,
    ) -> AppResult<RemoteIngest> {
        let start = Instant::now();
        let (url, host) = self.parse_source(source_url)?;
        let repository = match collection_hint.map(str::trim).filter(|c| !c.is_empty()) {
            Some(collection) => self.repository.for_collection(collection),
            None => self.repository.clone(),
        };

        let fetched = match self.fetch(&url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(
                    source_url = %url,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    error = %e,
                    "Remote fetch failed"
                );
                return Err(e.into());
            }
        };
        let hash = content_hash(&fetched.body)?;

        if let Some(existing) = repository.find_by_hash(&hash).await? {
            let id = existing.id.clone().unwrap_or_default();
            tracing::info!(media_id = %id, hash = %hash, "Remote media already ingested");
            return Ok(RemoteIngest {
                id,
                record: existing,
                deduplicated: true,
            });
        }

        let filename = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .unwrap_or_else(|| host.clone());

        let asset = RemoteAsset {
            hash,
            filename,
            source_url: url.to_string(),
            provider: host,
            mime_type: fetched.mime_type,
            size: fetched.body.len() as u64,
            owner: user_id.to_string(),
            fetched_at: Utc::now(),
        };
        let record = repository.insert(&MediaRecord::from(asset)).await?;
        cache::put_record(&*self.cache, repository.collection(), &record, self.cache_ttl).await;

        let id = record.id.clone().unwrap_or_default();
        tracing::info!(
            media_id = %id,
            provider = record.provider.as_deref().unwrap_or_default(),
            size_bytes = record.size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote media ingested"
        );

        Ok(RemoteIngest {
            id,
            record,
            deduplicated: false,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use mediastore_core::{MediaStoreConfig, MediaType};
    use mediastore_db::{MemoryCache, MemoryDocumentStore};

    fn fetcher(configure: impl FnOnce(&mut MediaStoreConfig)) -> (RemoteMediaFetcher, MediaRepository) {
        let mut config = MediaStoreConfig::from_lookup(|_| None).unwrap();
        configure(&mut config);
        let repository = MediaRepository::new(Arc::new(MemoryDocumentStore::new()), "media");
        let fetcher = RemoteMediaFetcher::new(
            &repository,
            Arc::new(MemoryCache::with_capacity(8)),
            &Config(Box::new(config)),
        )
        .unwrap();
        (fetcher, repository.for_collection(REMOTE_MEDIA_COLLECTION))
    }

    #[tokio::test]
    async fn test_ingest_remote_builds_remote_video_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/clips/intro%20cut.mp4")
            .with_status(200)
            .with_header("content-type", "video/mp4; codecs=avc1")
            .with_body("not really a video")
            .create_async()
            .await;
        let (fetcher, remote) = fetcher(|_| {});
        let source = format!("{}/clips/intro%20cut.mp4", server.url());

        let result = fetcher.ingest_remote(&source, None, "alice").await.unwrap();
        mock.assert_async().await;

        assert!(!result.deduplicated);
        assert_eq!(result.record.media_type, MediaType::RemoteVideo);
        assert_eq!(result.record.filename, "intro cut.mp4");
        assert_eq!(result.record.mime_type, "video/mp4");
        assert_eq!(result.record.provider.as_deref(), Some("127.0.0.1"));
        assert_eq!(result.record.external_id.as_deref(), Some(source.as_str()));
        assert!(remote.get(&result.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_same_body_is_deduplicated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("same bytes")
            .expect(2)
            .create_async()
            .await;
        let (fetcher, remote) = fetcher(|_| {});

        let first = fetcher
            .ingest_remote(&format!("{}/a.bin", server.url()), None, "alice")
            .await
            .unwrap();
        let second = fetcher
            .ingest_remote(&format!("{}/b.bin", server.url()), None, "bob")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.deduplicated);
        assert_eq!(second.record.mime_type, DEFAULT_MIME_TYPE);
        assert_eq!(remote.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_http_errors_map_to_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.mp4")
            .with_status(404)
            .create_async()
            .await;
        let (fetcher, _) = fetcher(|_| {});

        let result = fetcher
            .ingest_remote(&format!("{}/missing.mp4", server.url()), None, "alice")
            .await;
        assert!(matches!(result, Err(AppError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/big.bin")
            .with_status(200)
            .with_body(vec![7u8; 64])
            .create_async()
            .await;
        let (fetcher, _) = fetcher(|config| config.remote_max_bytes = 16);

        let result = fetcher
            .ingest_remote(&format!("{}/big.bin", server.url()), None, "alice")
            .await;
        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
    }

    #[tokio::test]
    async fn test_rejects_bad_urls_before_fetching() {
        let (fetcher, _) = fetcher(|config| {
            config.remote_allowed_hosts = Some(vec!["videos.example.com".to_string()])
        });

        for url in ["not a url", "ftp://videos.example.com/a.mp4", "http://127.0.0.1/a.mp4"] {
            assert!(matches!(
                fetcher.ingest_remote(url, None, "alice").await,
                Err(AppError::InvalidInput(_))
            ));
        }
    }
}
