//! `/albums/*` handlers: album management and share links.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::auth::{AuthUser, CsrfChecked};
use super::extract::JsonBody;
use super::handlers::{AppState, SuccessResponse};
use crate::account::ShareMode;
use crate::album::{AlbumView, EnsuredShare, ShareInfo};
use crate::error::AlbumError;
use crate::storage::ObjectStore;

// =============================================================================
// Request and Response Types
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAlbumRequest {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAlbumResponse {
    pub success: bool,
    pub album: AlbumView,
}

/// Photos of one album, as shown to owners and guests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumPhotosResponse {
    pub album_id: String,
    pub title: String,
    pub photos: Vec<String>,
    pub cover_url: Option<String>,
}

/// `POST /albums/{id}/share/ensure` body. The body itself is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnsureShareRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackShareRequest {
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

fn default_ok() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareAccessRequest {
    #[serde(default)]
    pub mode: ShareMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareAccessResponse {
    pub token: String,
    pub album_id: String,
    pub mode: ShareMode,
}

/// Path parameters of `/albums/{id}/share/{shareId}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SharePathParams {
    pub id: String,
    #[serde(rename = "shareId")]
    pub share_id: String,
}

// =============================================================================
// Owner Handlers
// =============================================================================

/// `GET /albums/mine`: the caller's albums, newest first.
pub async fn my_albums_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<AlbumView>>, AlbumError> {
    let (user_id, _) = principal.require_user()?;
    let albums = state.albums.mine(user_id).await?;
    Ok(Json(albums.iter().map(AlbumView::from).collect()))
}

/// `POST /albums`
///
/// - `201 Created`: `{"success": true, "album": {...}}`
/// - `400 Bad Request`: empty or over-long title
pub async fn create_album_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
    _csrf: CsrfChecked,
    JsonBody(request): JsonBody<CreateAlbumRequest>,
) -> Result<impl IntoResponse, AlbumError> {
    let (user_id, _) = principal.require_user()?;
    let album = state.albums.create(user_id, &request.title).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAlbumResponse {
            success: true,
            album: AlbumView::from(&album),
        }),
    ))
}

/// `DELETE /albums/{id}`
pub async fn delete_album_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
    _csrf: CsrfChecked,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AlbumError> {
    let (user_id, _) = principal.require_user()?;
    state.albums.delete(user_id, &id).await?;
    Ok(SuccessResponse::ok())
}

/// `GET /albums/{id}/photos`: readable by the owner and by guests holding a
/// token for this album.
pub async fn album_photos_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<AlbumPhotosResponse>, AlbumError> {
    let album = state.albums.authorize(&principal, &id, false).await?;
    Ok(Json(AlbumPhotosResponse {
        album_id: album.id,
        title: album.title,
        photos: album.photo_urls,
        cover_url: album.cover_url,
    }))
}

/// `POST /albums/{id}/share/ensure`: return the live share link, creating
/// one if needed.
///
/// The body is optional: `{"password": "..."}` protects the link.
pub async fn ensure_share_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
    _csrf: CsrfChecked,
    Path(id): Path<String>,
    body: Option<JsonBody<EnsureShareRequest>>,
) -> Result<Json<EnsuredShare>, AlbumError> {
    let (user_id, _) = principal.require_user()?;
    let password = body.and_then(|JsonBody(request)| request.password);

    let ensured = state
        .albums
        .ensure_share(user_id, &id, password.as_deref(), state.share_ttl)
        .await?;
    Ok(Json(ensured))
}

/// `DELETE /albums/{id}/share`
pub async fn revoke_share_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
    _csrf: CsrfChecked,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AlbumError> {
    let (user_id, _) = principal.require_user()?;
    state.albums.revoke_share(user_id, &id).await?;
    Ok(SuccessResponse::ok())
}

/// `POST /albums/{id}/share/track`: `{"channel": "whatsapp", "ok": true}`
pub async fn track_share_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    AuthUser(principal): AuthUser,
    _csrf: CsrfChecked,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<TrackShareRequest>,
) -> Result<Json<SuccessResponse>, AlbumError> {
    let (user_id, _) = principal.require_user()?;
    state
        .albums
        .track_share(user_id, &id, &request.channel, request.ok, request.meta)
        .await?;
    Ok(SuccessResponse::ok())
}

// =============================================================================
// Public Share Handlers
// =============================================================================

/// `GET /albums/{id}/share/{shareId}`: what a visitor sees before entering.
pub async fn share_info_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Path(params): Path<SharePathParams>,
) -> Result<Json<ShareInfo>, AlbumError> {
    let info = state.albums.share_info(&params.id, &params.share_id).await?;
    Ok(Json(info))
}

/// `POST /albums/{id}/share/{shareId}/access`
///
/// - `200 OK`: `{"token": "<guest jwt>", "albumId": "...", "mode": "view"}`
/// - `401 Unauthorized`: wrong or missing password
/// - `404 Not Found`: album or share id unknown
/// - `410 Gone`: link expired
pub async fn share_access_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Path(params): Path<SharePathParams>,
    body: Option<JsonBody<ShareAccessRequest>>,
) -> Result<Json<ShareAccessResponse>, AlbumError> {
    let request = body.map(|JsonBody(request)| request).unwrap_or_default();

    let token = state
        .albums
        .grant_access(
            &params.id,
            &params.share_id,
            request.mode,
            request.password.as_deref(),
        )
        .await?;

    Ok(Json(ShareAccessResponse {
        token,
        album_id: params.id,
        mode: request.mode,
    }))
}
