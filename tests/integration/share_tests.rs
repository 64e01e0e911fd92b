//! Share link integration tests.
//!
//! Tests verify:
//! - Ensuring a link reuses a live one
//! - Link resolution requires both album id and share id
//! - Password protection and guest tokens
//! - Guest permissions (view vs add, other albums, user-only routes)
//! - Revocation and expiry

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};

use wedding_gallery::storage::MemoryObjectStore;

use super::test_utils::{
    bare_request, create_album, csrf, get, json_request, png_bytes, register_and_login, send,
    send_json, test_app, test_app_with, test_settings, upload_png, upload_request, zip_entry_names,
    FormPart, OutageStore,
};

async fn ensure_share(router: &Router, token: &str, album_id: &str, body: Value) -> Value {
    let csrf = csrf(router).await;
    let (status, value) = send_json(
        router,
        json_request(
            "POST",
            &format!("/albums/{}/share/ensure", album_id),
            &body,
            Some(token),
            Some(&csrf),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", value);
    value
}

async fn access(
    router: &Router,
    album_id: &str,
    share_id: &str,
    body: Value,
) -> (StatusCode, Value) {
    send_json(
        router,
        json_request(
            "POST",
            &format!("/albums/{}/share/{}/access", album_id, share_id),
            &body,
            None,
            None,
        ),
    )
    .await
}

#[tokio::test]
async fn test_ensure_share_reuses_live_link() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;

    let first = ensure_share(&router, &token, &album_id, json!({})).await;
    assert_eq!(first["created"], true);
    let share_id = first["shareId"].as_str().unwrap();
    assert!(first["shareLink"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/share/{}/{}", album_id, share_id)));

    let second = ensure_share(&router, &token, &album_id, json!({})).await;
    assert_eq!(second["created"], false);
    assert_eq!(second["shareId"], first["shareId"]);

    let (_, albums) = send_json(&router, get("/albums/mine", Some(&token))).await;
    assert_eq!(albums[0]["shareId"], first["shareId"]);
}

#[tokio::test]
async fn test_share_info_requires_matching_ids() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;
    let other_album = create_album(&router, &token, "Reception").await;

    let share = ensure_share(&router, &token, &album_id, json!({})).await;
    let share_id = share["shareId"].as_str().unwrap();

    let (status, body) = send_json(
        &router,
        get(&format!("/albums/{}/share/{}", album_id, share_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Ceremony");
    assert_eq!(body["expired"], false);
    assert_eq!(body["protected"], false);

    // Right share id, wrong album
    let (status, body) = send_json(
        &router,
        get(&format!("/albums/{}/share/{}", other_album, share_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "share_not_found");

    // Right album, wrong share id
    let (status, _) = send_json(
        &router,
        get(&format!("/albums/{}/share/deadbeef", album_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = access(&router, &other_album, share_id, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guest_can_view_album() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;
    let photo = upload_png(&router, &token, Some(&album_id)).await;

    let share = ensure_share(&router, &token, &album_id, json!({})).await;
    let share_id = share["shareId"].as_str().unwrap();

    let (status, body) = access(&router, &album_id, share_id, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["albumId"], album_id.as_str());
    assert_eq!(body["mode"], "view");
    let guest = body["token"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &router,
        get(&format!("/albums/{}/photos", album_id), Some(&guest)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["photos"][0].as_str().unwrap().ends_with(&photo));

    // Guests can download a selection from their album
    let (status, zip) = send(
        &router,
        json_request(
            "POST",
            "/download-selected",
            &json!({ "filenames": [photo] }),
            Some(&guest),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(zip_entry_names(&zip), vec![photo.clone()]);
}

#[tokio::test]
async fn test_guest_restrictions() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;
    let other_album = create_album(&router, &token, "Reception").await;
    let outside = upload_png(&router, &token, Some(&other_album)).await;

    let share = ensure_share(&router, &token, &album_id, json!({})).await;
    let (_, body) = access(&router, &album_id, share["shareId"].as_str().unwrap(), json!({})).await;
    let guest = body["token"].as_str().unwrap().to_string();

    // Other albums
    let (status, _) = send_json(
        &router,
        get(&format!("/albums/{}/photos", other_album), Some(&guest)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // User-only routes
    for uri in ["/photos", "/albums/mine", "/auth/me", "/download-all"] {
        let (status, _) = send_json(&router, get(uri, Some(&guest))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
    }

    // Photos outside the album
    let (status, _) = send_json(
        &router,
        json_request(
            "POST",
            "/download-selected",
            &json!({ "filenames": [outside] }),
            Some(&guest),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // View-mode guests cannot upload
    let png = png_bytes();
    let parts = [
        FormPart::File {
            name: "photos",
            file_name: "guest.png",
            content_type: "image/png",
            data: &png,
        },
        FormPart::Text {
            name: "albumId",
            value: &album_id,
        },
    ];
    let csrf = csrf(&router).await;
    let (status, _) = send_json(&router, upload_request(&parts, &guest, &csrf)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_add_mode_guest_can_upload() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;

    let share = ensure_share(&router, &token, &album_id, json!({})).await;
    let (status, body) = access(
        &router,
        &album_id,
        share["shareId"].as_str().unwrap(),
        json!({ "mode": "add" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "add");
    let guest = body["token"].as_str().unwrap().to_string();

    let png = png_bytes();
    let file = FormPart::File {
        name: "photos",
        file_name: "from-guest.png",
        content_type: "image/png",
        data: &png,
    };

    // Must name the album
    let csrf_a = csrf(&router).await;
    let (status, _) = send_json(&router, upload_request(&[file], &guest, &csrf_a)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let parts = [
        FormPart::File {
            name: "photos",
            file_name: "from-guest.png",
            content_type: "image/png",
            data: &png,
        },
        FormPart::Text {
            name: "albumId",
            value: &album_id,
        },
    ];
    let csrf_b = csrf(&router).await;
    let (status, body) = send_json(&router, upload_request(&parts, &guest, &csrf_b)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (_, body) = send_json(
        &router,
        get(&format!("/albums/{}/photos", album_id), Some(&token)),
    )
    .await;
    assert_eq!(body["photos"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_password_protected_share() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;

    let share = ensure_share(&router, &token, &album_id, json!({ "password": "rings" })).await;
    let share_id = share["shareId"].as_str().unwrap();

    let (_, info) = send_json(
        &router,
        get(&format!("/albums/{}/share/{}", album_id, share_id), None),
    )
    .await;
    assert_eq!(info["protected"], true);

    let (status, body) = access(&router, &album_id, share_id, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_password");

    let (status, _) = access(&router, &album_id, share_id, json!({ "password": "nope" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = access(&router, &album_id, share_id, json!({ "password": "rings" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn test_revoked_share_invalidates_guest_tokens() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;

    let share = ensure_share(&router, &token, &album_id, json!({})).await;
    let share_id = share["shareId"].as_str().unwrap().to_string();
    let (_, body) = access(&router, &album_id, &share_id, json!({})).await;
    let guest = body["token"].as_str().unwrap().to_string();

    let csrf = csrf(&router).await;
    let (status, _) = send_json(
        &router,
        bare_request(
            "DELETE",
            &format!("/albums/{}/share", album_id),
            &token,
            Some(&csrf),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &router,
        get(&format!("/albums/{}/photos", album_id), Some(&guest)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = access(&router, &album_id, &share_id, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A new link gets a new id
    let renewed = ensure_share(&router, &token, &album_id, json!({})).await;
    assert_eq!(renewed["created"], true);
    assert_ne!(renewed["shareId"], share_id.as_str());
}

#[tokio::test]
async fn test_expired_share_is_gone() {
    let mut settings = test_settings();
    settings.share_ttl = Duration::from_secs(1);
    let router = test_app_with(Arc::new(MemoryObjectStore::new()), settings);

    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;
    let share = ensure_share(&router, &token, &album_id, json!({})).await;
    let share_id = share["shareId"].as_str().unwrap().to_string();

    let (_, body) = access(&router, &album_id, &share_id, json!({})).await;
    let guest = body["token"].as_str().unwrap().to_string();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, info) = send_json(
        &router,
        get(&format!("/albums/{}/share/{}", album_id, share_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["expired"], true);

    let (status, body) = access(&router, &album_id, &share_id, json!({})).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "share_expired");

    let (status, _) = send_json(
        &router,
        get(&format!("/albums/{}/photos", album_id), Some(&guest)),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);

    // Ensuring again replaces the expired link
    let renewed = ensure_share(&router, &token, &album_id, json!({})).await;
    assert_eq!(renewed["created"], true);
}

#[tokio::test]
async fn test_share_lookup_during_storage_outage() {
    let store = Arc::new(OutageStore::new());
    let router = test_app_with(store.clone(), test_settings());

    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;
    let share = ensure_share(&router, &token, &album_id, json!({})).await;
    let share_id = share["shareId"].as_str().unwrap().to_string();

    store.set_down(true);

    let (status, body) = send_json(
        &router,
        get(&format!("/albums/{}/share/{}", album_id, share_id), None),
    )
    .await;
    assert!(status.is_server_error(), "{}", status);
    assert_eq!(body["error"], "connection_error");

    let (status, body) = access(&router, &album_id, &share_id, json!({})).await;
    assert!(status.is_server_error(), "{}", status);
    assert_ne!(body["error"], "share_not_found");

    store.set_down(false);
    let (status, _) = access(&router, &album_id, &share_id, json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

fn raw_json(
    uri: &str,
    body: &'static str,
    token: Option<&str>,
    csrf: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(csrf) = csrf {
        builder = builder.header("x-csrf-token", csrf);
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn test_optional_share_bodies() {
    let router = test_app();
    let token = register_and_login(&router, "anna@example.com").await;
    let album_id = create_album(&router, &token, "Ceremony").await;
    let ensure_uri = format!("/albums/{}/share/ensure", album_id);

    // Malformed JSON is reported like every other bad body
    let csrf_token = csrf(&router).await;
    let (status, body) = send_json(
        &router,
        raw_json(&ensure_uri, "{\"password\":", Some(&token), Some(&csrf_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(body["status"], 400);
    assert!(body["message"].is_string());

    // No body at all still mints an open link
    let csrf_token = csrf(&router).await;
    let (status, share) = send_json(
        &router,
        bare_request("POST", &ensure_uri, &token, Some(&csrf_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(share["created"], true);
    let share_id = share["shareId"].as_str().unwrap();

    let access_uri = format!("/albums/{}/share/{}/access", album_id, share_id);
    let (status, body) = send_json(&router, raw_json(&access_uri, "not json", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, body) = send_json(&router, raw_json(&access_uri, "", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
}
