//! HTTP-level integration tests for the image rendition service: signed
//! requests, request coalescing under concurrency, queue saturation,
//! and rejection paths. Each test builds its own router against a
//! throwaway storage directory, so they can run fully in parallel.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use image::{DynamicImage, ImageFormat};
use image_service::cache::CoalescingCache;
use image_service::processor::ImageProcessor;
use image_service::router::{build_router, AppState};
use image_service::signer::Signer;
use image_service::source_cache::SourceCache;
use image_service::store::{LocalBlobStore, LocalImageLibrary};
use tower::ServiceExt;

const TEST_KEY: &[u8] = b"integration-test-key";

fn write_fixture(dir: &std::path::Path, id: &str) {
    let mut buf = std::io::Cursor::new(Vec::new());
    DynamicImage::new_rgb8(32, 32)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    std::fs::File::create(dir.join(id))
        .unwrap()
        .write_all(&buf.into_inner())
        .unwrap();
}

fn build_test_app(storage: &std::path::Path, workers: usize) -> axum::Router {
    let blob_store = Arc::new(LocalBlobStore::new(storage));
    let source_cache = Arc::new(SourceCache::new(blob_store));
    let processor = Arc::new(ImageProcessor::new(
        workers,
        source_cache,
        Arc::new(LocalImageLibrary),
    ));
    let state = Arc::new(AppState {
        signer: Signer::new(TEST_KEY.to_vec()),
        cache: CoalescingCache::new(),
        processor,
    });
    build_router(state, Duration::from_secs(60))
}

fn signed_uri(path: &str, extra_query: &[(&str, &str)]) -> String {
    let signer = Signer::new(TEST_KEY.to_vec());
    let pairs: Vec<(String, String)> = extra_query
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let canonical = Signer::canonical_form(path, &pairs);
    let sig = signer.sign(&canonical).unwrap();

    let mut query = extra_query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>();
    query.push(format!("hmac={sig}"));
    format!("{path}?{}", query.join("&"))
}

#[tokio::test]
async fn signed_request_returns_rendered_bytes() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "photo-1");
    let app = build_test_app(dir.path(), 2);

    let uri = signed_uri("/id/photo-1/50/50.jpg", &[]);
    let response = app
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(response.headers().get("picsum-id").unwrap(), "photo-1");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(!body.is_empty());
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "photo-1");
    let app = build_test_app(dir.path(), 2);

    let response = app
        .oneshot(
            Request::get("/id/photo-1/50/50.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "photo-1");
    let app = build_test_app(dir.path(), 2);

    let mut uri = signed_uri("/id/photo-1/50/50.jpg", &[]);
    uri.push('0'); // corrupt the trailing signature hex

    let response = app
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_dimensions_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "photo-1");
    let app = build_test_app(dir.path(), 2);

    let uri = signed_uri("/id/photo-1/6000/50.jpg", &[]);
    let response = app
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_source_id_is_an_upstream_failure() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path(), 2);

    let uri = signed_uri("/id/does-not-exist/50/50.jpg", &[]);
    let response = app
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn concurrent_identical_requests_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "popular");
    let app = build_test_app(dir.path(), 4);

    let uri = signed_uri("/id/popular/64/64.jpg", &[]);
    let mut handles = Vec::new();
    for _ in 0..50 {
        let app = app.clone();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move {
            app.oneshot(Request::get(&uri).body(Body::empty()).unwrap())
                .await
                .unwrap()
                .status()
        }));
    }

    for h in handles {
        assert_eq!(h.await.unwrap(), StatusCode::OK);
    }
}

#[tokio::test]
async fn blur_and_grayscale_query_params_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "photo-1");
    let app = build_test_app(dir.path(), 2);

    let uri = signed_uri(
        "/id/photo-1/50/50.webp",
        &[("blur", "3"), ("grayscale", "")],
    );
    let response = app
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/webp"
    );
}
