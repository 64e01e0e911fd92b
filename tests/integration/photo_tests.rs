//! Photo integration tests.
//!
//! Tests verify:
//! - Upload validation (content type, magic bytes, size) and partial rejection
//! - Listing order
//! - Image serving headers and the image cache
//! - Selected and full zip downloads, including the archive size limit

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use wedding_gallery::photo::PhotoLimits;
use wedding_gallery::storage::MemoryObjectStore;

use super::test_utils::{
    bare_request, csrf, filename_of, get, jpeg_bytes, json_request, png_bytes,
    register_and_login, send, send_json, test_app, test_app_with, test_settings, upload_png,
    upload_request, zip_entry_names, FormPart, TrackingStore,
};

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_rejects_non_images() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;

    let parts = [
        FormPart::File {
            name: "photos",
            file_name: "notes.txt",
            content_type: "text/plain",
            data: b"hello",
        },
        FormPart::File {
            name: "photos",
            file_name: "fake.png",
            content_type: "image/png",
            data: b"definitely not a png",
        },
    ];
    let csrf = csrf(&router).await;
    let (status, body) = send_json(&router, upload_request(&parts, &token, &csrf)).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "upload_rejected");

    let (_, body) = send_json(&router, get("/photos", Some(&token))).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_reports_partial_rejection() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;

    let jpeg = jpeg_bytes();
    let parts = [
        FormPart::File {
            name: "photos",
            file_name: "vows.jpg",
            content_type: "image/jpeg",
            data: &jpeg,
        },
        FormPart::File {
            name: "photos",
            file_name: "menu.pdf",
            content_type: "application/pdf",
            data: b"%PDF-1.4",
        },
    ];
    let csrf = csrf(&router).await;
    let (status, body) = send_json(&router, upload_request(&parts, &token, &csrf)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["uploaded"].as_array().unwrap().len(), 1);
    assert!(body["uploaded"][0].as_str().unwrap().ends_with("vows.jpg"));
    assert_eq!(body["rejected"][0]["name"], "menu.pdf");
    assert!(body.get("album").is_none());
}

#[tokio::test]
async fn test_upload_enforces_size_limit() {
    let mut settings = test_settings();
    settings.photo_limits = PhotoLimits {
        max_upload_bytes: 16,
        ..PhotoLimits::default()
    };
    let router = test_app_with(Arc::new(MemoryObjectStore::new()), settings);
    let token = register_and_login(&router, "anna@example.com").await;

    let png = png_bytes();
    let parts = [FormPart::File {
        name: "photos",
        file_name: "big.png",
        content_type: "image/png",
        data: &png,
    }];
    let csrf = csrf(&router).await;
    let (status, body) = send_json(&router, upload_request(&parts, &token, &csrf)).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["message"].as_str().unwrap().contains("too large"));
}

#[tokio::test]
async fn test_upload_without_files() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;

    let parts = [FormPart::Text {
        name: "coverIndex",
        value: "0",
    }];
    let csrf = csrf(&router).await;
    let (status, body) = send_json(&router, upload_request(&parts, &token, &csrf)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_files");
}

// =============================================================================
// Listing and Deletion
// =============================================================================

#[tokio::test]
async fn test_photos_listed_newest_first() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;

    let first = upload_png(&router, &token, None).await;
    let second = upload_png(&router, &token, None).await;

    let (status, body) = send_json(&router, get("/photos", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    // A bare array of URLs
    let names = body
        .as_array()
        .unwrap()
        .iter()
        .map(|url| filename_of(url.as_str().unwrap()))
        .collect::<Vec<_>>();
    assert_eq!(names, vec![second, first]);
}

#[tokio::test]
async fn test_delete_missing_photo() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;

    let csrf = csrf(&router).await;
    let (status, body) = send_json(
        &router,
        bare_request("DELETE", "/photos/1_missing.png", &token, Some(&csrf)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "photo_not_found");
}

// =============================================================================
// Image Serving
// =============================================================================

#[tokio::test]
async fn test_image_served_with_headers_and_cached() {
    let store = Arc::new(TrackingStore::new());
    let router = test_app_with(store.clone(), test_settings());
    let token = register_and_login(&router, "anna@example.com").await;
    let name = upload_png(&router, &token, None).await;
    store.reset_tracking();

    let uri = format!("/images/{}", urlencoding::encode(&name));
    let request = || Request::builder().uri(&uri).body(Body::empty()).unwrap();

    // No token needed
    let response = router.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert!(response.headers()[header::CACHE_CONTROL]
        .to_str()
        .unwrap()
        .starts_with("public, max-age="));
    assert_eq!(response.headers()["x-image-cache-hit"], "false");
    assert_eq!(store.get_count(), 1);

    let response = router.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.headers()["x-image-cache-hit"], "true");
    assert_eq!(store.get_count(), 1);

    let (status, data) = send(&router, request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data.as_ref(), png_bytes().as_slice());
}

#[tokio::test]
async fn test_deleted_image_leaves_cache() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let name = upload_png(&router, &token, None).await;
    let uri = format!("/images/{}", urlencoding::encode(&name));

    let (status, _) = send(&router, get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);

    let csrf = csrf(&router).await;
    let (status, _) = send_json(
        &router,
        bare_request(
            "DELETE",
            &format!("/photos/{}", urlencoding::encode(&name)),
            &token,
            Some(&csrf),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, get(&uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_image_is_404() {
    let router = test_app();
    let (status, body) = send_json(&router, get("/images/1_nothing.jpg", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "photo_not_found");
}

// =============================================================================
// Downloads
// =============================================================================

#[tokio::test]
async fn test_download_selected_returns_zip() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let first = upload_png(&router, &token, None).await;
    let second = upload_png(&router, &token, None).await;
    upload_png(&router, &token, None).await;

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/download-selected",
            &json!({ "filenames": [first, second, first] }),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"selection_"));

    let (_, data) = send(
        &router,
        json_request(
            "POST",
            "/download-selected",
            &json!({ "filenames": [first, second] }),
            Some(&token),
            None,
        ),
    )
    .await;
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(zip_entry_names(&data), expected);
}

#[tokio::test]
async fn test_download_selected_errors() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;

    let (status, body) = send_json(
        &router,
        json_request(
            "POST",
            "/download-selected",
            &json!({ "filenames": [] }),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_selection");

    let (status, _) = send_json(
        &router,
        json_request(
            "POST",
            "/download-selected",
            &json!({ "filenames": ["1_ghost.png"] }),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &router,
        json_request(
            "POST",
            "/download-selected",
            &json!({ "filenames": ["x"] }),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_download_selected_size_limit() {
    let mut settings = test_settings();
    settings.photo_limits = PhotoLimits {
        max_archive_bytes: 64,
        ..PhotoLimits::default()
    };
    let router = test_app_with(Arc::new(MemoryObjectStore::new()), settings);
    let token = register_and_login(&router, "anna@example.com").await;
    let first = upload_png(&router, &token, None).await;
    let second = upload_png(&router, &token, None).await;

    let (status, body) = send_json(
        &router,
        json_request(
            "POST",
            "/download-selected",
            &json!({ "filenames": [first, second] }),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "selection_too_large");
}

#[tokio::test]
async fn test_download_all_returns_every_photo() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let first = upload_png(&router, &token, None).await;
    let second = upload_png(&router, &token, None).await;

    let response = router
        .clone()
        .oneshot(get("/download-all", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("photos_"));

    let (_, data) = send(&router, get("/download-all", Some(&token))).await;
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(zip_entry_names(&data), expected);
}

#[tokio::test]
async fn test_download_all_size_limit() {
    let mut settings = test_settings();
    settings.photo_limits = PhotoLimits {
        max_download_all_bytes: png_bytes().len() as u64,
        ..PhotoLimits::default()
    };
    let router = test_app_with(Arc::new(MemoryObjectStore::new()), settings);
    let token = register_and_login(&router, "anna@example.com").await;

    upload_png(&router, &token, None).await;
    let (status, _) = send(&router, get("/download-all", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    upload_png(&router, &token, None).await;
    let (status, body) = send_json(&router, get("/download-all", Some(&token))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "selection_too_large");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Archive too large"));
}
