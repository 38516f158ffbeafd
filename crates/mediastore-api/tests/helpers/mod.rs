//! Test helpers: build an AppState over a temporary local backend and drive
//! the router in-process with `oneshot`.

#![allow(dead_code)]

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use mediastore_api::auth::StaticSessionValidator;
use mediastore_api::setup::default_permissions;
use mediastore_api::setup::routes::{setup_routes, API_PREFIX};
use mediastore_api::state::{AppState, Collaborators};
use mediastore_core::{Config, MediaStoreConfig, StorageConfig};
use mediastore_db::{MemoryCache, MemoryDocumentStore};
use mediastore_storage::LocalStorage;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ALICE: &str = "alice-token";
pub const BOB: &str = "bob-token";
pub const ADMIN: &str = "admin-token";

const BOUNDARY: &str = "mediastore-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");

    let mut media_config = MediaStoreConfig::from_lookup(|_| None).unwrap();
    media_config.storage = StorageConfig::local(&public, "media");
    media_config.archive_temp_dir = Some(dir.path().join("archives"));
    media_config.max_file_size_bytes = 1024 * 1024;
    let config = Config(Box::new(media_config));

    let local = LocalStorage::new(&public, "media").await.unwrap();
    let public_root = Some(local.media_root());
    let sessions = StaticSessionValidator::new()
        .with_token(ALICE, "alice", &[])
        .with_token(BOB, "bob", &[])
        .with_token(ADMIN, "root", &["admin"]);

    let state = AppState::new(
        config,
        Collaborators {
            storage: Arc::new(local),
            store: Arc::new(MemoryDocumentStore::new()),
            cache: Arc::new(MemoryCache::with_capacity(64)),
            evaluator: Arc::new(default_permissions()),
            sessions: Arc::new(sessions),
            public_root,
        },
    )
    .unwrap();
    let router = setup_routes(state.clone()).unwrap();

    TestApp {
        router,
        state,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, token: Option<&str>, uri: &str) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn json(&self, method: Method, token: &str, uri: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn delete(&self, token: &str, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Multipart upload with a `file` part and an optional `path` part.
    pub async fn upload(
        &self,
        token: &str,
        uri: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        path: Option<&str>,
    ) -> TestResponse {
        let mut body = Vec::new();
        if let Some(path) = path {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"path\"\r\n\r\n{}\r\n",
                    BOUNDARY, path
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Upload a small PDF as the holder of `token` and return the created record.
    pub async fn upload_pdf(&self, token: &str, filename: &str, folder: &str) -> Value {
        let response = self
            .upload(
                token,
                &api_path("/media"),
                filename,
                "application/pdf",
                format!("%PDF-1.4 {}", filename).as_bytes(),
                Some(folder),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.json()
    }
}
