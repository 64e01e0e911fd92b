//! Test utilities for integration tests.
//!
//! Provides a request-counting object store, a fully wired test app, request
//! builders for JSON and multipart bodies, and small encoded test images.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use wedding_gallery::account::HashCost;
use wedding_gallery::config::Settings;
use wedding_gallery::error::StoreError;
use wedding_gallery::server::{create_router, AppState, RouterConfig};
use wedding_gallery::storage::{MemoryObjectStore, ObjectStore, StoredObject};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789";
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const BOUNDARY: &str = "gallery-test-boundary";

// =============================================================================
// Tracking Store
// =============================================================================

/// An in-memory store that counts reads.
///
/// Used to verify that the image cache avoids repeated fetches.
#[derive(Clone, Default)]
pub struct TrackingStore {
    inner: Arc<MemoryObjectStore>,
    gets: Arc<AtomicUsize>,
}

impl TrackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn reset_tracking(&self) {
        self.gets.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for TrackingStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn head(&self, key: &str) -> Result<u64, StoreError> {
        self.inner.head(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.list(prefix).await
    }

    fn identifier(&self) -> &str {
        "tracking://test"
    }
}

// =============================================================================
// Outage Store
// =============================================================================

/// An in-memory store whose reads can be switched to fail like an
/// unreachable backend.
#[derive(Clone, Default)]
pub struct OutageStore {
    inner: Arc<MemoryObjectStore>,
    down: Arc<AtomicBool>,
}

impl OutageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Connection(format!("outage reading {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for OutageStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StoreError> {
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn head(&self, key: &str) -> Result<u64, StoreError> {
        self.check(key)?;
        self.inner.head(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.check(prefix)?;
        self.inner.list(prefix).await
    }

    fn identifier(&self) -> &str {
        "outage://test"
    }
}

// =============================================================================
// App Construction
// =============================================================================

/// Settings with a cheap password hash so tests run quickly.
pub fn test_settings() -> Settings {
    let mut settings = Settings::new(TEST_SECRET);
    settings.hash_cost = HashCost {
        memory_kib: 1024,
        iterations: 1,
    };
    settings
}

/// A router over an in-memory store.
pub fn test_app() -> Router {
    test_app_with(Arc::new(MemoryObjectStore::new()), test_settings())
}

/// A router over `store` with custom settings.
pub fn test_app_with<S: ObjectStore + 'static>(store: Arc<S>, settings: Settings) -> Router {
    let state = AppState::new(store, &settings).unwrap();
    create_router(state, RouterConfig::new().with_tracing(false))
}

// =============================================================================
// Requests
// =============================================================================

/// Send a request and return status plus body bytes.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

/// Send a request and parse the body as JSON.
pub async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, value)
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// A JSON request with optional bearer and CSRF tokens.
pub fn json_request(
    method: &str,
    uri: &str,
    body: &Value,
    token: Option<&str>,
    csrf: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(csrf) = csrf {
        builder = builder.header("x-csrf-token", csrf);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// A body-less request (DELETE and friends) with bearer and CSRF tokens.
pub fn bare_request(method: &str, uri: &str, token: &str, csrf: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    if let Some(csrf) = csrf {
        builder = builder.header("x-csrf-token", csrf);
    }
    builder.body(Body::empty()).unwrap()
}

/// One part of a multipart upload.
pub enum FormPart<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

/// Encode parts as a `multipart/form-data` body using [`BOUNDARY`].
pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A `POST /upload` request.
pub fn upload_request(parts: &[FormPart<'_>], token: &str, csrf: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header("x-csrf-token", csrf)
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

// =============================================================================
// Flows
// =============================================================================

/// Fetch a CSRF token.
pub async fn csrf(router: &Router) -> String {
    let (status, body) = send_json(router, get("/auth/csrf", None)).await;
    assert_eq!(status, StatusCode::OK);
    body["csrfToken"].as_str().unwrap().to_string()
}

/// Register `email` and return a bearer token.
pub async fn register_and_login(router: &Router, email: &str) -> String {
    let credentials = serde_json::json!({ "email": email, "password": TEST_PASSWORD });

    let (status, _) = send_json(
        router,
        json_request("POST", "/auth/register", &credentials, None, None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(
        router,
        json_request("POST", "/auth/login", &credentials, None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// Create an album and return its id.
pub async fn create_album(router: &Router, token: &str, title: &str) -> String {
    let csrf = csrf(router).await;
    let (status, body) = send_json(
        router,
        json_request(
            "POST",
            "/albums",
            &serde_json::json!({ "title": title }),
            Some(token),
            Some(&csrf),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["album"]["_id"].as_str().unwrap().to_string()
}

/// Upload one PNG (optionally into an album) and return its stored file name.
pub async fn upload_png(router: &Router, token: &str, album_id: Option<&str>) -> String {
    let png = png_bytes();
    let mut parts = vec![FormPart::File {
        name: "photos",
        file_name: "first-dance.png",
        content_type: "image/png",
        data: &png,
    }];
    if let Some(album_id) = album_id {
        parts.push(FormPart::Text {
            name: "albumId",
            value: album_id,
        });
    }

    let csrf = csrf(router).await;
    let (status, body) = send_json(router, upload_request(&parts, token, &csrf)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    filename_of(body["uploaded"][0].as_str().unwrap())
}

/// Stored file name from a photo URL.
pub fn filename_of(url: &str) -> String {
    let encoded = url.rsplit('/').next().unwrap();
    urlencoding::decode(encoded).unwrap().into_owned()
}

// =============================================================================
// Test Images
// =============================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
    })
}

/// A small, genuinely encoded PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    gradient(8, 8).write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A small, genuinely encoded JPEG.
pub fn jpeg_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    gradient(16, 16)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

/// Read the entry names of a zip archive.
pub fn zip_entry_names(data: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
    let mut names = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect::<Vec<_>>();
    names.sort();
    names
}
