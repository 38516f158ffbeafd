#![allow(dead_code)]

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mediastore_core::{Config, MediaStoreConfig};
use mediastore_db::{MediaRepository, MemoryCache, MemoryDocumentStore, RolePermissionEvaluator};
use mediastore_services::{MediaIngestionService, UploadedFile};
use mediastore_storage::Storage;
use std::io::Cursor;
use std::sync::Arc;

pub fn config() -> Config {
    Config(Box::new(MediaStoreConfig::from_lookup(|_| None).unwrap()))
}

pub fn repository() -> MediaRepository {
    MediaRepository::new(Arc::new(MemoryDocumentStore::new()), "media")
}

pub fn ingestion(storage: Arc<dyn Storage>, repository: MediaRepository) -> MediaIngestionService {
    MediaIngestionService::new(
        storage,
        repository,
        Arc::new(MemoryCache::with_capacity(64)),
        Arc::new(RolePermissionEvaluator::new()),
        &config(),
    )
    .unwrap()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .unwrap();
    out
}

pub fn jpeg_upload(name: &str, data: &[u8]) -> UploadedFile {
    UploadedFile {
        filename: name.to_string(),
        mime_type: "image/jpeg".to_string(),
        data: Bytes::copy_from_slice(data),
    }
}

pub fn pdf_upload(name: &str, body: &[u8]) -> UploadedFile {
    UploadedFile {
        filename: name.to_string(),
        mime_type: "application/pdf".to_string(),
        data: Bytes::copy_from_slice(body),
    }
}
