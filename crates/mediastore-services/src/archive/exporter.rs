use bytes::Bytes;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::Stream;
use mediastore_core::{AppError, AppResult};
use mediastore_db::MediaRepository;
use mediastore_storage::Storage;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::ReaderStream;

use super::tar;

const GZIP_LEVEL: u32 = 6;

pub const CONTENT_TYPE: &str = "application/gzip";

/// A finished `.tar.gz` on local disk.
#[derive(Debug)]
pub struct ExportedArchive {
    pub path: PathBuf,
    /// Download name, `media-<timestamp>.tar.gz`.
    pub filename: String,
    pub entries: usize,
    pub skipped: usize,
    pub size: u64,
}

impl ExportedArchive {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    /// Open the archive as a byte stream. The file is removed when the stream
    /// is dropped, whether or not it was read to the end.
    pub async fn into_stream(self) -> AppResult<ArchiveStream> {
        let file = File::open(&self.path).await?;
        Ok(ArchiveStream {
            inner: ReaderStream::new(file),
            _cleanup: RemoveOnDrop(self.path),
        })
    }
}

struct RemoveOnDrop(PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => tracing::debug!(path = %self.0.display(), "Removed temporary archive"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.0.display(), error = %e, "Failed to remove temporary archive")
            }
        }
    }
}

/// Streams a compressed archive and deletes it afterwards.
pub struct ArchiveStream {
    inner: ReaderStream<File>,
    _cleanup: RemoveOnDrop,
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Builds `.tar.gz` downloads from stored objects, one file at a time.
#[derive(Clone)]
pub struct ArchiveExporter {
    storage: Arc<dyn Storage>,
    repository: MediaRepository,
    temp_dir: PathBuf,
}

fn basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

impl ArchiveExporter {
    pub fn new(storage: Arc<dyn Storage>, repository: MediaRepository, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            repository,
            temp_dir: temp_dir.into(),
        }
    }

    /// Archive the given storage-relative paths. Entries are named by basename.
    pub async fn export(&self, paths: &[String]) -> AppResult<ExportedArchive> {
        if paths.is_empty() {
            return Err(AppError::InvalidInput("No files selected for export".to_string()));
        }
        let entries: Vec<(String, String)> = paths
            .iter()
            .map(|p| (p.clone(), basename(p).to_string()))
            .collect();
        self.build(&entries).await
    }

    /// Archive the originals of the given records, named by their filename.
    /// Unknown ids are skipped.
    pub async fn export_records(&self, ids: &[String]) -> AppResult<ExportedArchive> {
        if ids.is_empty() {
            return Err(AppError::InvalidInput("No media selected for export".to_string()));
        }

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(record) = self.repository.get(id).await? else {
                tracing::warn!(media_id = %id, "Skipping unknown media in export");
                continue;
            };
            match self.storage.key_from_url(&record.url) {
                Some(key) => entries.push((key, basename(&record.filename).to_string())),
                None => tracing::warn!(media_id = %id, url = %record.url, "Skipping media without stored bytes"),
            }
        }
        self.build(&entries).await
    }

    #[tracing::instrument(skip(self, entries), fields(requested = entries.len()))]
    async fn build(&self, entries: &[(String, String)]) -> AppResult<ExportedArchive> {
        let start = Instant::now();
        tokio::fs::create_dir_all(&self.temp_dir).await?;

        let timestamp = Utc::now().timestamp_millis();
        let stem = format!("media-{}-{}", timestamp, uuid::Uuid::new_v4().simple());
        let tar_path = self.temp_dir.join(format!("{}.tar", stem));
        let gz_path = self.temp_dir.join(format!("{}.tar.gz", stem));

        let written = match self.write_tar(&tar_path, entries).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&tar_path).await;
                return Err(e);
            }
        };

        let compressed = {
            let (from, to) = (tar_path.clone(), gz_path.clone());
            tokio::task::spawn_blocking(move || compress(&from, &to))
                .await
                .map_err(|e| AppError::Internal(format!("Compression task failed: {}", e)))?
        };
        if let Err(e) = compressed {
            let _ = tokio::fs::remove_file(&tar_path).await;
            let _ = tokio::fs::remove_file(&gz_path).await;
            return Err(e.into());
        }
        tokio::fs::remove_file(&tar_path).await?;

        let size = tokio::fs::metadata(&gz_path).await?.len();
        tracing::info!(
            entries = written,
            skipped = entries.len() - written,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive built"
        );

        Ok(ExportedArchive {
            path: gz_path,
            filename: format!("media-{}.tar.gz", timestamp),
            entries: written,
            skipped: entries.len() - written,
            size,
        })
    }

    async fn write_tar(&self, path: &Path, entries: &[(String, String)]) -> AppResult<usize> {
        let mut out = BufWriter::new(File::create(path).await?);
        let mtime = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        let mut written = 0;

        for (key, name) in entries {
            let data = match self.storage.read(key).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping unreadable file in archive");
                    continue;
                }
            };
            let header = match tar::header(name, data.len() as u64, mtime) {
                Ok(header) => header,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping file with invalid archive entry");
                    continue;
                }
            };

            out.write_all(&header).await?;
            out.write_all(&data).await?;
            out.write_all(&vec![0u8; tar::padding(data.len() as u64)]).await?;
            written += 1;
        }

        out.write_all(&tar::end_of_archive()).await?;
        out.flush().await?;
        Ok(written)
    }
}

fn compress(from: &Path, to: &Path) -> io::Result<()> {
    let mut input = std::fs::File::open(from)?;
    let output = io::BufWriter::new(std::fs::File::create(to)?);
    let mut encoder = GzEncoder::new(output, Compression::new(GZIP_LEVEL));
    io::copy(&mut input, &mut encoder)?;
    let mut output = encoder.finish()?;
    io::Write::flush(&mut output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use futures::StreamExt;
    use mediastore_db::MemoryDocumentStore;
    use mediastore_storage::MemoryStorage;
    use std::io::Read;

    fn exporter(storage: &MemoryStorage, dir: &Path) -> ArchiveExporter {
        ArchiveExporter::new(
            Arc::new(storage.clone()),
            MediaRepository::new(Arc::new(MemoryDocumentStore::new()), "media"),
            dir,
        )
    }

    fn gunzip(path: &Path) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(std::fs::File::open(path).unwrap())
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[tokio::test]
    async fn test_export_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new("media");
        storage.save(b"hello", "docs/original/a.txt").await.unwrap();
        storage.save(&[3u8; 600], "docs/original/b.bin").await.unwrap();

        let archive = exporter(&storage, dir.path())
            .export(&[
                "docs/original/a.txt".to_string(),
                "docs/original/missing.txt".to_string(),
                "docs/original/b.bin".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(archive.entries, 2);
        assert_eq!(archive.skipped, 1);
        assert!(archive.filename.starts_with("media-"));
        assert!(archive.filename.ends_with(".tar.gz"));
        assert_eq!(
            archive.content_disposition(),
            format!("attachment; filename=\"{}\"", archive.filename)
        );

        let tar = gunzip(&archive.path);
        assert_eq!(tar.len(), 512 + 512 + 512 + 1024 + 1024);
        assert!(tar[tar.len() - 1024..].iter().all(|&b| b == 0));
        assert_eq!(&tar[..5], b"a.txt");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(leftovers.len(), 1);
        assert!(leftovers[0].ends_with(".tar.gz"));
    }

    #[tokio::test]
    async fn test_stream_removes_file_when_done() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new("media");
        storage.save(b"bytes", "x/y.bin").await.unwrap();

        let archive = exporter(&storage, dir.path())
            .export(&["x/y.bin".to_string()])
            .await
            .unwrap();
        let path = archive.path.clone();
        let expected = std::fs::read(&path).unwrap();

        let mut stream = archive.into_stream().await.unwrap();
        let mut streamed = Vec::new();
        while let Some(chunk) = stream.next().await {
            streamed.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(streamed, expected);
        drop(stream);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter(&MemoryStorage::new("media"), dir.path());
        assert!(matches!(
            exporter.export(&[]).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            exporter.export_records(&[]).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
