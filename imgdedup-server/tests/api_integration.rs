//! API integration tests for imgdedup-server.
//!
//! These tests drive the router with realistic multipart requests against an
//! in-memory repository and a temporary upload directory.

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
use imgdedup_core::{MemoryRepository, StorageConfig};
use imgdedup_server::{create_router, AppState, Config};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";

/// Helper to create a multipart body with one `file` part
fn create_upload_multipart(content: &[u8], file_name: &str, mime: &str) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Multipart body with only a text part
fn create_text_only_multipart() -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\n");
    body.extend_from_slice(b"no image here\r\n");
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Smooth scene with a bright disc
fn scene() -> DynamicImage {
    let img: RgbImage = ImageBuffer::from_fn(96, 96, |x, y| {
        let dx = x as i32 - 40;
        let dy = y as i32 - 48;
        let base = (x + y) as u8;
        if dx * dx + dy * dy < 400 {
            Rgb([240, 220, 200])
        } else {
            Rgb([base, base / 2, 255 - base])
        }
    });
    DynamicImage::ImageRgb8(img)
}

/// The scene flipped left to right, distinct under every hash
fn mirrored_scene() -> DynamicImage {
    scene().fliph()
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

struct TestApp {
    router: Router,
    dir: TempDir,
}

fn create_test_app_with(config: Config) -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = Config {
        storage: StorageConfig::rooted_at(dir.path()),
        ..config
    };
    let state = AppState::new(Arc::new(MemoryRepository::new()), &config);
    TestApp {
        router: imgdedup_server::create_router_with_config(state, &config),
        dir,
    }
}

fn create_test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = Config {
        storage: StorageConfig::rooted_at(dir.path()),
        ..Config::default()
    };
    let state = AppState::new(Arc::new(MemoryRepository::new()), &config);
    TestApp {
        router: create_router(state),
        dir,
    }
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn upload(app: &Router, content_type: String, body: Vec<u8>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header("Content-Type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn upload_file(app: &Router, content: &[u8], file_name: &str, mime: &str) -> (StatusCode, Value) {
    let (content_type, body) = create_upload_multipart(content, file_name, mime);
    upload(app, content_type, body).await
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_reports_backend_and_count() {
    let app = create_test_app();

    let (status, json) = get_json(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], "memory");
    assert_eq!(json["record_count"], 0);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint_returns_ok() {
    let app = create_test_app();

    let (status, json) = get_json(&app.router, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
}

#[tokio::test]
async fn test_openapi_document_lists_upload() {
    let app = create_test_app();

    let (status, json) = get_json(&app.router, "/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/upload"]["post"].is_object());
    assert!(json["paths"]["/health"]["get"].is_object());
}

// ============================================================================
// Upload Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_upload_admits_new_image() {
    let app = create_test_app();
    let png = encode(&scene(), ImageFormat::Png);

    let (status, json) = upload_file(&app.router, &png, "scene.png", "image/png").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "success");
    assert!(json["processing_time"].as_f64().unwrap() >= 0.0);

    let path = json["path"].as_str().unwrap();
    assert!(path.ends_with(".png"), "unexpected path {path}");
    let stored = app.dir.path().join(path);
    assert_eq!(std::fs::read(stored).unwrap(), png);

    let (_, health) = get_json(&app.router, "/health").await;
    assert_eq!(health["record_count"], 1);
}

#[tokio::test]
async fn test_identical_upload_is_reported_as_duplicate() {
    let app = create_test_app();
    let png = encode(&scene(), ImageFormat::Png);

    let (first, admitted) = upload_file(&app.router, &png, "scene.png", "image/png").await;
    assert_eq!(first, StatusCode::CREATED);

    let (status, json) = upload_file(&app.router, &png, "copy.png", "image/png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "duplicate");
    assert_eq!(json["total"], 1);
    assert_eq!(json["message"], "Found 1 similar image(s)");
    let best = &json["matches"][0];
    assert_eq!(best["path"], admitted["path"]);
    assert_eq!(best["similarity"], 100.0);
    assert_eq!(best["match_type"], "content_digest");

    let (_, health) = get_json(&app.router, "/health").await;
    assert_eq!(health["record_count"], 1);
}

#[tokio::test]
async fn test_reencoded_upload_is_reported_as_duplicate() {
    let app = create_test_app();
    let image = scene();

    let (first, _) = upload_file(&app.router, &encode(&image, ImageFormat::Png), "scene.png", "image/png").await;
    assert_eq!(first, StatusCode::CREATED);

    // Lossless WebP: same pixels, different bytes
    let webp = encode(&image, ImageFormat::WebP);
    let (status, json) = upload_file(&app.router, &webp, "scene.webp", "image/webp").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "duplicate");
    assert_eq!(json["matches"][0]["similarity"], 100.0);
    assert_eq!(json["matches"][0]["match_type"], "exact_phash");
}

#[tokio::test]
async fn test_distinct_images_are_both_admitted() {
    let app = create_test_app();

    let (a, _) = upload_file(&app.router, &encode(&scene(), ImageFormat::Png), "a.png", "image/png").await;
    let (b, _) = upload_file(
        &app.router,
        &encode(&mirrored_scene(), ImageFormat::Png),
        "b.png",
        "image/png",
    )
    .await;

    assert_eq!(a, StatusCode::CREATED);
    assert_eq!(b, StatusCode::CREATED);
}

#[tokio::test]
async fn test_upload_without_file_returns_400() {
    let app = create_test_app();
    let (content_type, body) = create_text_only_multipart();

    let (status, json) = upload(&app.router, content_type, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_with_bad_extension_returns_400() {
    let app = create_test_app();
    let png = encode(&scene(), ImageFormat::Png);

    let (status, json) = upload_file(&app.router, &png, "scene.bmp", "image/png").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid file extension");
}

#[tokio::test]
async fn test_non_image_bytes_with_image_mime_returns_400() {
    let app = create_test_app();
    let html = b"<!DOCTYPE html><html><body>not an image</body></html>";

    let (status, json) = upload_file(&app.router, html, "scene.png", "image/png").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
    assert_eq!(json["error"], "Invalid file type: unrecognised");

    let (_, health) = get_json(&app.router, "/health").await;
    assert_eq!(health["record_count"], 0);
}

#[tokio::test]
async fn test_declared_mime_is_ignored_for_real_image() {
    let app = create_test_app();
    let png = encode(&scene(), ImageFormat::Png);

    let (status, json) = upload_file(&app.router, &png, "scene.png", "text/html").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "success");
}

#[tokio::test]
async fn test_corrupt_image_returns_422_and_stores_nothing() {
    let app = create_test_app();
    let mut png = encode(&scene(), ImageFormat::Png);
    png.truncate(40);

    let (status, json) = upload_file(&app.router, &png, "broken.png", "image/png").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "INVALID_IMAGE");

    let (_, health) = get_json(&app.router, "/health").await;
    assert_eq!(health["record_count"], 0);
    let leftovers = std::fs::read_dir(app.dir.path().join("temp"))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_oversized_upload_returns_413() {
    let app = create_test_app_with(Config {
        max_file_size_mb: 1,
        ..Config::default()
    });
    let oversized = vec![0u8; 1024 * 1024 + 1];

    let (status, json) = upload_file(&app.router, &oversized, "huge.png", "image/png").await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "FILE_TOO_LARGE");
    assert_eq!(json["error"], "File too large (max 1MB)");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/images/unknown").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
