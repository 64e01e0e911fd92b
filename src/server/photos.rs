//! Photo handlers: listing, multipart upload, deletion, image serving and
//! zip downloads.

use std::collections::HashSet;

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::auth::{AuthUser, CsrfChecked};
use super::extract::JsonBody;
use super::handlers::AppState;
use crate::account::Principal;
use crate::album::AlbumView;
use crate::error::{AlbumError, AuthError, PhotoError};
use crate::photo::{archive_name, filename_from_url, RejectedFile, UploadFile};
use crate::storage::ObjectStore;

/// Multipart field carrying image files (may repeat).
pub const PHOTOS_FIELD: &str = "photos";

/// Multipart field naming the target album.
pub const ALBUM_ID_FIELD: &str = "albumId";

/// Multipart field picking the album cover among the uploaded files.
pub const COVER_INDEX_FIELD: &str = "coverIndex";

// =============================================================================
// Request and Response Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub uploaded: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedFile>,
    /// The album after the new photos were attached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<AlbumView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePhotoResponse {
    pub success: bool,
    pub albums_updated: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadSelectedRequest {
    #[serde(default)]
    pub filenames: Vec<String>,
}

/// Parsed `POST /upload` form.
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<UploadFile>,
    album_id: Option<String>,
    cover_index: Option<usize>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, PhotoError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PhotoError::InvalidUpload(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            PHOTOS_FIELD => {
                let file_name = field.file_name().unwrap_or("photo").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| PhotoError::InvalidUpload(e.body_text()))?;
                form.files.push(UploadFile {
                    name: file_name,
                    content_type,
                    data,
                });
            }
            ALBUM_ID_FIELD => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| PhotoError::InvalidUpload(e.body_text()))?;
                let value = value.trim();
                if !value.is_empty() {
                    form.album_id = Some(value.to_string());
                }
            }
            COVER_INDEX_FIELD => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| PhotoError::InvalidUpload(e.body_text()))?;
                // Negative or empty means "no explicit cover"
                form.cover_index = match value.trim().parse::<i64>() {
                    Ok(i) if i >= 0 => Some(i as usize),
                    Ok(_) => None,
                    Err(_) if value.trim().is_empty() => None,
                    Err(_) => {
                        return Err(PhotoError::InvalidUpload(format!(
                            "coverIndex must be an integer, got {:?}",
                            value
                        )))
                    }
                };
            }
            other => debug!(field = %other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

fn user_only(principal: &Principal) -> Result<(), PhotoError> {
    principal
        .require_user()
        .map(|_| ())
        .map_err(|e| PhotoError::Album(AlbumError::Auth(e)))
}

fn zip_response(data: Bytes, file_name: &str) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        Body::from(data),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /photos`: every stored photo URL, newest first.
pub async fn list_photos_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<String>>, PhotoError> {
    user_only(&principal)?;
    Ok(Json(state.photos.list().await?))
}

/// `POST /upload` (multipart)
///
/// Fields: `photos` (one or more files), optional `albumId`, optional
/// `coverIndex`. Guests need an add-mode token and must name their album.
///
/// - `201 Created`: `{"success": true, "uploaded": [...], "rejected": [...]}`
/// - `400 Bad Request`: no files, or a malformed form
/// - `403 Forbidden`: album not writable by the caller
/// - `415 Unsupported Media Type`: every file was rejected
pub async fn upload_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
    _csrf: CsrfChecked,
    multipart: Multipart,
) -> Result<impl IntoResponse, PhotoError> {
    let form = read_upload_form(multipart).await?;

    match (&principal, &form.album_id) {
        (_, Some(album_id)) => {
            state.albums.authorize(&principal, album_id, true).await?;
        }
        (Principal::Guest { .. }, None) => {
            return Err(PhotoError::Album(AlbumError::Auth(AuthError::Forbidden(
                "guests must upload into their album".to_string(),
            ))));
        }
        (Principal::User { .. }, None) => {}
    }

    let report = state.photos.upload(form.files).await?;

    let album = match form.album_id {
        Some(ref album_id) => {
            // A rejected cover file means no explicit cover
            let cover = form.cover_index.and_then(|i| report.stored_position(i));
            let album = state
                .albums
                .attach_photos(album_id, &report.uploaded, cover)
                .await?;
            Some(AlbumView::from(&album))
        }
        None => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            uploaded: report.uploaded,
            rejected: report.rejected,
            album,
        }),
    ))
}

/// `DELETE /photos/{name}`: delete a photo and drop it from every album.
pub async fn delete_photo_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
    _csrf: CsrfChecked,
    Path(name): Path<String>,
) -> Result<Json<DeletePhotoResponse>, PhotoError> {
    user_only(&principal)?;
    state.photos.delete(&name).await?;
    let albums_updated = state.albums.detach_photo(&name).await?;

    Ok(Json(DeletePhotoResponse {
        success: true,
        albums_updated,
    }))
}

/// `GET /images/{name}`: serve a stored photo.
///
/// Public so `<img src>` works without headers. Responses carry
/// `Cache-Control: public, max-age=N` and `X-Image-Cache-Hit`.
pub async fn image_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Response, PhotoError> {
    let image = state.photos.fetch(&name).await?;

    let content_type = HeaderValue::from_str(&image.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let cache_control = HeaderValue::from_str(&format!("public, max-age={}", state.cache_max_age))
        .unwrap_or_else(|_| HeaderValue::from_static("public"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, cache_control),
            (
                header::HeaderName::from_static("x-image-cache-hit"),
                HeaderValue::from_static(if image.cache_hit { "true" } else { "false" }),
            ),
        ],
        Body::from(image.data),
    )
        .into_response())
}

/// `GET /download-all`: zip of every stored photo.
///
/// Accepts the token as `?access_token=` so a plain link can trigger the
/// download. Users only; not subject to the selection size limit.
pub async fn download_all_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
) -> Result<Response, PhotoError> {
    user_only(&principal)?;
    let data = state.photos.archive_all().await?;

    info!(bytes = data.len(), "Serving full photo archive");
    Ok(zip_response(
        data,
        &archive_name("photos", Utc::now().date_naive()),
    ))
}

/// `POST /download-selected`: `{"filenames": [...]}` -> zip.
///
/// Guests may only select photos of their own album.
///
/// - `400 Bad Request`: empty selection or invalid name
/// - `403 Forbidden`: a guest selected a photo outside the album
/// - `404 Not Found`: a selected photo does not exist
/// - `413 Payload Too Large`: selection exceeds the archive limit
pub async fn download_selected_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
    JsonBody(request): JsonBody<DownloadSelectedRequest>,
) -> Result<Response, PhotoError> {
    if let Principal::Guest { ref album_id, .. } = principal {
        let album = state.albums.authorize(&principal, album_id, false).await?;
        let allowed = album
            .photo_urls
            .iter()
            .filter_map(|url| filename_from_url(url))
            .collect::<HashSet<_>>();
        if let Some(outside) = request.filenames.iter().find(|n| !allowed.contains(*n)) {
            warn!(album_id = %album_id, name = %outside, "Guest selected photo outside album");
            return Err(PhotoError::Album(AlbumError::Forbidden {
                album_id: album_id.clone(),
            }));
        }
    }

    let data = state.photos.archive(&request.filenames).await?;
    Ok(zip_response(
        data,
        &archive_name("selection", Utc::now().date_naive()),
    ))
}
