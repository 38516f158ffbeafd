mod common;

use mediastore_core::{MediaStatus, TrashFailurePolicy};
use mediastore_db::MemoryCache;
use mediastore_services::TrashManager;
use mediastore_storage::{LocalStorage, Storage};
use std::sync::Arc;

#[tokio::test]
async fn move_to_trash_on_local_backend() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path(), "media").await.unwrap());
    let repository = common::repository();
    let service = common::ingestion(storage.clone(), repository.clone());

    let record = service
        .ingest(common::pdf_upload("contract.pdf", b"%PDF-1.7 signed"), "legal", "alice")
        .await
        .unwrap();
    let original = storage.key_from_url(&record.url).unwrap();
    assert!(storage.exists(&original).await.unwrap());

    let trash = TrashManager::new(
        storage.clone(),
        repository.clone(),
        Arc::new(MemoryCache::with_capacity(8)),
        TrashFailurePolicy::default(),
    );
    let outcome = trash.move_to_trash(&record.url, None).await.unwrap();

    assert!(!storage.exists(&original).await.unwrap());
    let trash_path = outcome.trash_path.unwrap();
    assert!(trash_path.starts_with(".trash/"));
    assert_eq!(storage.read(&trash_path).await.unwrap(), b"%PDF-1.7 signed");
    assert!(dir.path().join("media").join(&trash_path).is_file());

    let id = record.id.unwrap();
    let stored = repository.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, MediaStatus::Trashed);
    assert!(stored.deleted_at.is_some());

    let listed = service.list(&Default::default(), 1, 10).await.unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn duplicate_uploads_keep_their_bytes_until_the_last_record_goes() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path(), "media").await.unwrap());
    let repository = common::repository();
    let service = common::ingestion(storage.clone(), repository.clone());
    let trash = TrashManager::new(
        storage.clone(),
        repository.clone(),
        Arc::new(MemoryCache::with_capacity(8)),
        TrashFailurePolicy::default(),
    );

    let first = service
        .ingest(common::pdf_upload("a.pdf", b"%PDF-1.7 same"), "docs", "alice")
        .await
        .unwrap();
    let second = service
        .ingest(common::pdf_upload("a.pdf", b"%PDF-1.7 same"), "docs", "alice")
        .await
        .unwrap();
    let key = storage.key_from_url(&second.url).unwrap();
    let (first_id, second_id) = (first.id.unwrap(), second.id.unwrap());

    let outcome = trash.move_record_to_trash(&second_id, None).await.unwrap();
    assert_eq!(outcome.record.unwrap().id.as_deref(), Some(second_id.as_str()));
    let first_stored = repository.get(&first_id).await.unwrap().unwrap();
    assert_eq!(first_stored.status, MediaStatus::Active);
    assert!(storage.exists(&key).await.unwrap());

    service.delete_media(&first_id).await.unwrap();
    assert!(storage.exists(&key).await.unwrap());

    service.delete_media(&second_id).await.unwrap();
    assert!(!storage.exists(&key).await.unwrap());
}

#[tokio::test]
async fn restore_after_a_swallowed_local_trash_failure() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path(), "media").await.unwrap());
    let repository = common::repository();
    let service = common::ingestion(storage.clone(), repository.clone());
    let trash = TrashManager::new(
        storage.clone(),
        repository.clone(),
        Arc::new(MemoryCache::with_capacity(8)),
        TrashFailurePolicy::ByBackend,
    );

    let record = service
        .ingest(common::pdf_upload("a.pdf", b"%PDF-1.7 kept"), "docs", "alice")
        .await
        .unwrap();
    let id = record.id.unwrap();

    // A plain file where the trash directory belongs makes the move fail.
    let blocker = dir.path().join("media").join(".trash");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let outcome = trash.move_record_to_trash(&id, None).await.unwrap();
    assert!(outcome.trash_path.is_none());
    std::fs::remove_file(&blocker).unwrap();

    let restored = trash.restore(&id, None).await.unwrap();
    assert_eq!(restored.status, MediaStatus::Active);
    let key = storage.key_from_url(&restored.url).unwrap();
    assert_eq!(storage.read(&key).await.unwrap(), b"%PDF-1.7 kept");
}

#[tokio::test]
async fn identical_uploads_in_two_folders_share_one_trash_key() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path(), "media").await.unwrap());
    let repository = common::repository();
    let service = common::ingestion(storage.clone(), repository.clone());
    let trash = TrashManager::new(
        storage.clone(),
        repository.clone(),
        Arc::new(MemoryCache::with_capacity(8)),
        TrashFailurePolicy::default(),
    );

    let docs = service
        .ingest(common::pdf_upload("a.pdf", b"%PDF-1.7 twice"), "docs", "alice")
        .await
        .unwrap();
    let legal = service
        .ingest(common::pdf_upload("a.pdf", b"%PDF-1.7 twice"), "legal", "alice")
        .await
        .unwrap();
    assert_ne!(docs.url, legal.url);
    let (docs_id, legal_id) = (docs.id.unwrap(), legal.id.unwrap());

    let first = trash.move_record_to_trash(&docs_id, None).await.unwrap();
    let second = trash.move_record_to_trash(&legal_id, None).await.unwrap();
    assert_eq!(first.trash_path, second.trash_path);
    let trash_path = second.trash_path.unwrap();

    service.delete_media(&docs_id).await.unwrap();
    assert_eq!(storage.read(&trash_path).await.unwrap(), b"%PDF-1.7 twice");

    let restored = trash.restore(&legal_id, None).await.unwrap();
    assert_eq!(restored.status, MediaStatus::Active);
    let key = storage.key_from_url(&restored.url).unwrap();
    assert_eq!(storage.read(&key).await.unwrap(), b"%PDF-1.7 twice");
    assert!(!storage.exists(&trash_path).await.unwrap());
}
