//! Remote ingestion endpoint against a mock origin.

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::{api_path, spawn_app, ALICE};
use serde_json::json;

#[tokio::test]
async fn test_remote_ingest_envelope_and_dedup() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/clips/intro.mp4")
        .with_status(200)
        .with_header("content-type", "video/mp4")
        .with_body(vec![7u8; 256])
        .expect(2)
        .create_async()
        .await;
    let app = spawn_app().await;
    let file_url = format!("{}/clips/intro.mp4", server.url());

    let created = app
        .json(Method::POST, ALICE, &api_path("/media/remote"), json!({ "fileUrl": file_url }))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    let body = created.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["fileInfo"]["filename"], "intro.mp4");
    assert_eq!(body["fileInfo"]["mimeType"], "video/mp4");
    let id = body["id"].as_str().unwrap().to_string();

    let repeated = app
        .json(Method::POST, ALICE, &api_path("/media/remote"), json!({ "fileUrl": file_url }))
        .await;
    assert_eq!(repeated.status, StatusCode::OK);
    assert_eq!(repeated.json()["id"], id);
    assert_eq!(repeated.json()["deduplicated"], true);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_ingest_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/gone.png")
        .with_status(404)
        .create_async()
        .await;
    let app = spawn_app().await;

    let upstream = app
        .json(
            Method::POST,
            ALICE,
            &api_path("/media/remote"),
            json!({ "fileUrl": format!("{}/gone.png", server.url()) }),
        )
        .await;
    assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
    assert_eq!(upstream.json()["code"], "FETCH_ERROR");

    let bad_scheme = app
        .json(Method::POST, ALICE, &api_path("/media/remote"), json!({ "fileUrl": "ftp://example.com/a" }))
        .await;
    assert_eq!(bad_scheme.status, StatusCode::BAD_REQUEST);

    let missing_field = app
        .json(Method::POST, ALICE, &api_path("/media/remote"), json!({ "url": "http://x" }))
        .await;
    assert_eq!(missing_field.status, StatusCode::BAD_REQUEST);
}
