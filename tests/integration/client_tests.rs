//! End-to-end tests driving [`ApiClient`] against a live server.
//!
//! Each test binds the router on an ephemeral local port and talks to it
//! over real HTTP.

use bytes::Bytes;

use wedding_gallery::account::ShareMode;
use wedding_gallery::error::ClientError;
use wedding_gallery::photo::{filename_from_url, UploadFile};
use wedding_gallery::{ApiClient, DownloadProgress};

use super::test_utils::{jpeg_bytes, png_bytes, test_app, zip_entry_names, TEST_PASSWORD};

/// Serve a fresh test app and return its base URL.
async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = test_app();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn upload(name: &str, content_type: &str, data: Vec<u8>) -> UploadFile {
    UploadFile {
        name: name.to_string(),
        content_type: Some(content_type.to_string()),
        data: Bytes::from(data),
    }
}

#[tokio::test]
async fn test_client_full_flow() {
    let base_url = spawn_server().await;
    let mut owner = ApiClient::new(&base_url).unwrap();

    owner
        .register("anna@example.com", TEST_PASSWORD, Some("Anna"))
        .await
        .unwrap();
    owner.login("anna@example.com", TEST_PASSWORD).await.unwrap();
    assert!(owner.is_logged_in());
    assert_eq!(owner.me().await.unwrap().email, "anna@example.com");

    let album = owner.create_album("Ceremony").await.unwrap();
    let uploaded = owner
        .upload_photos(
            vec![
                upload("rings.png", "image/png", png_bytes()),
                upload("kiss.jpg", "image/jpeg", jpeg_bytes()),
            ],
            Some(&album.id),
            Some(1),
        )
        .await
        .unwrap();
    assert_eq!(uploaded.uploaded.len(), 2);
    assert_eq!(
        uploaded.album.as_ref().unwrap().cover_url.as_deref(),
        Some(uploaded.uploaded[1].as_str())
    );

    let names = owner
        .photos()
        .await
        .unwrap()
        .iter()
        .filter_map(|url| filename_from_url(url))
        .collect::<Vec<_>>();
    assert_eq!(names.len(), 2);

    let image = owner.image(&names[0]).await.unwrap();
    assert!(!image.is_empty());

    let albums = owner.my_albums().await.unwrap();
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].photo_urls.len(), 2);

    owner
        .track_share(&album.id, "whatsapp", true, None)
        .await
        .unwrap();
    let share = owner.ensure_share_link(&album.id, None).await.unwrap();
    assert!(share.created);

    // A visitor opens the link
    let mut guest = ApiClient::new(&base_url).unwrap();
    let info = guest.share_info(&album.id, &share.share_id).await.unwrap();
    assert_eq!(info.title, "Ceremony");
    assert!(!info.protected);

    let access = guest
        .access_share(&album.id, &share.share_id, ShareMode::View, None)
        .await
        .unwrap();
    assert_eq!(access.album_id, album.id);
    assert!(guest.is_logged_in());

    let photos = guest.album_photos(&album.id).await.unwrap();
    assert_eq!(photos.photos.len(), 2);

    let zip = guest.download_selected(&names).await.unwrap();
    let mut expected = names.clone();
    expected.sort();
    assert_eq!(zip_entry_names(&zip), expected);

    // Guests are limited to their album
    match guest.photos().await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 403),
        other => panic!("expected 403, got {:?}", other),
    }

    let all = owner.download_all().await.unwrap();
    assert_eq!(zip_entry_names(&all).len(), 2);

    owner.revoke_share_link(&album.id).await.unwrap();
    assert!(guest.album_photos(&album.id).await.is_err());

    let deleted = owner.delete_photo(&names[0]).await.unwrap();
    assert_eq!(deleted.albums_updated, 1);

    owner.remove_album(&album.id).await.unwrap();
    assert!(owner.my_albums().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_client_download_reports_progress() {
    let base_url = spawn_server().await;
    let mut client = ApiClient::new(&base_url).unwrap();
    client
        .register("anna@example.com", TEST_PASSWORD, None)
        .await
        .unwrap();
    client.login("anna@example.com", TEST_PASSWORD).await.unwrap();
    client
        .upload_photos(
            vec![
                upload("rings.png", "image/png", png_bytes()),
                upload("kiss.jpg", "image/jpeg", jpeg_bytes()),
            ],
            None,
            None,
        )
        .await
        .unwrap();

    let mut updates: Vec<DownloadProgress> = Vec::new();
    let zip = client
        .download_all_with_progress(|progress| updates.push(progress))
        .await
        .unwrap();
    assert_eq!(zip_entry_names(&zip).len(), 2);

    let last = updates.last().copied().unwrap();
    assert_eq!(last.received, zip.len() as u64);
    assert_eq!(last.total, Some(zip.len() as u64));
    assert_eq!(last.fraction(), Some(1.0));
    assert!(updates.windows(2).all(|w| w[0].received < w[1].received));

    let names = client
        .photos()
        .await
        .unwrap()
        .iter()
        .filter_map(|url| filename_from_url(url))
        .collect::<Vec<_>>();
    let mut received = 0;
    let selected = client
        .download_selected_with_progress(&names[..1], |progress| received = progress.received)
        .await
        .unwrap();
    assert_eq!(received, selected.len() as u64);
    assert_eq!(zip_entry_names(&selected), vec![names[0].clone()]);
}

#[tokio::test]
async fn test_client_reports_server_errors() {
    let base_url = spawn_server().await;
    let mut client = ApiClient::new(&base_url).unwrap();

    client
        .register("anna@example.com", TEST_PASSWORD, None)
        .await
        .unwrap();

    match client.login("anna@example.com", "wrong").await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("expected 401, got {:?}", other),
    }
    assert!(!client.is_logged_in());

    match client.register("anna@example.com", TEST_PASSWORD, None).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "User already exists");
        }
        other => panic!("expected 400, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_password_protected_share() {
    let base_url = spawn_server().await;
    let mut owner = ApiClient::new(&base_url).unwrap();
    owner
        .register("anna@example.com", TEST_PASSWORD, None)
        .await
        .unwrap();
    owner.login("anna@example.com", TEST_PASSWORD).await.unwrap();

    let album = owner.create_album("Reception").await.unwrap();
    let share = owner
        .ensure_share_link(&album.id, Some("rings"))
        .await
        .unwrap();

    let mut guest = ApiClient::new(&base_url).unwrap();
    match guest
        .access_share(&album.id, &share.share_id, ShareMode::Add, Some("nope"))
        .await
    {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected 401, got {:?}", other),
    }

    guest
        .access_share(&album.id, &share.share_id, ShareMode::Add, Some("rings"))
        .await
        .unwrap();
    let uploaded = guest
        .upload_photos(
            vec![upload("guest.png", "image/png", png_bytes())],
            Some(&album.id),
            None,
        )
        .await
        .unwrap();
    assert_eq!(uploaded.uploaded.len(), 1);

    let photos = owner.album_photos(&album.id).await.unwrap();
    assert_eq!(photos.photos, uploaded.uploaded);
    assert_eq!(photos.cover_url.as_deref(), Some(uploaded.uploaded[0].as_str()));
}
