// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Router-level tests for the upload pipeline
//!
//! These tests drive the real axum router with in-memory requests. No
//! model artifact is present, so detection failures exercise the
//! "free text in place of a prediction" branch; tests needing real
//! inference live behind #[ignore] next to the model wrapper.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use leafscan_node::{
    api::http_server::{router, AppState},
    api::predict::{DeliveryMode, SelectionPolicy},
    catalog::DiseaseCatalog,
    storage::{ImageStore, RetentionPolicy},
    vision::{Annotator, DetectorParams, LoadMode, ModelAccessor, DISEASE_CLASSES},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::util::ServiceExt;

// 1x1 red PNG - minimal valid image
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

const BOUNDARY: &str = "leafscan-test-boundary";

/// Helper: state over a temp store and a lazy accessor with no model file
async fn setup_test_state(upload_dir: &std::path::Path, delivery: DeliveryMode) -> AppState {
    let accessor = ModelAccessor::new(
        LoadMode::Lazy,
        "/nonexistent/leaf-disease.onnx",
        DISEASE_CLASSES.iter().map(|s| s.to_string()).collect(),
        DetectorParams::default(),
    )
    .await
    .expect("lazy accessor constructs without a model file");

    AppState {
        accessor: Arc::new(accessor),
        annotator: Arc::new(Annotator::without_font()),
        catalog: Arc::new(DiseaseCatalog::builtin()),
        store: Arc::new(ImageStore::new(upload_dir, RetentionPolicy::KeepAll).unwrap()),
        delivery,
        selection: SelectionPolicy::HighestConfidence,
        static_dir: PathBuf::from("./static"),
    }
}

/// Helper: multipart body with one `imagefile` part
fn multipart_body(filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"imagefile\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(filename: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(filename, bytes)))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_home_page_renders_form() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(setup_test_state(dir.path(), DeliveryMode::Stored).await);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("multipart/form-data"));
    assert!(body.contains("name=\"imagefile\""));
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(setup_test_state(dir.path(), DeliveryMode::Stored).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["catalog_entries"], 9);
}

#[tokio::test]
async fn test_predict_without_model_renders_failure_text() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(setup_test_state(dir.path(), DeliveryMode::Stored).await);

    let png = STANDARD.decode(TINY_PNG_BASE64).unwrap();
    let response = app.oneshot(multipart_request("leaf.png", &png)).await.unwrap();

    // Model failure is rendered as free text, not an error response
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Detection failed"), "body was: {body}");
    assert!(!body.contains("<img"));
}

#[tokio::test]
async fn test_predict_stores_the_raw_upload() {
    let dir = tempfile::tempdir().unwrap();
    let state = setup_test_state(dir.path(), DeliveryMode::Stored).await;
    let store = state.store.clone();
    let app = router(state);

    let png = STANDARD.decode(TINY_PNG_BASE64).unwrap();
    let response = app.oneshot(multipart_request("leaf.png", &png)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The upload is persisted before detection runs
    assert_eq!(store.read("leaf.png").unwrap(), png);
}

#[tokio::test]
async fn test_predict_missing_field_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(setup_test_state(dir.path(), DeliveryMode::Stored).await);

    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"other\"\r\n\r\n\
         hello\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_non_image_payload_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(setup_test_state(dir.path(), DeliveryMode::Stored).await);

    let response = app
        .oneshot(multipart_request("notes.txt", b"just some text"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_serve_stored_image() {
    let dir = tempfile::tempdir().unwrap();
    let state = setup_test_state(dir.path(), DeliveryMode::Stored).await;
    state.store.save_upload("leaf.jpg", b"jpeg-bytes").unwrap();
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/images/leaf.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "image/jpeg"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"jpeg-bytes");
}

#[tokio::test]
async fn test_serve_missing_image_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(setup_test_state(dir.path(), DeliveryMode::Stored).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/images/absent.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serve_image_rejects_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(setup_test_state(dir.path(), DeliveryMode::Stored).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/images/..%2Fsecret.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_favicon_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = setup_test_state(dir.path(), DeliveryMode::Stored).await;
    state.static_dir = dir.path().join("no-static-here");
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/favicon.ico")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favicon_passthrough() {
    let dir = tempfile::tempdir().unwrap();
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("favicon.ico"), b"icon-bytes").unwrap();

    let mut state = setup_test_state(dir.path(), DeliveryMode::Stored).await;
    state.static_dir = static_dir;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/favicon.ico")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "image/vnd.microsoft.icon"
    );
}
