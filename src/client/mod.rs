//! HTTP client for the gallery API.
//!
//! [`ApiClient`] keeps the session token returned by login (or by opening a
//! share link) and attaches it as `Authorization: Bearer <token>` to every
//! call. Mutating calls first fetch a CSRF token from `/auth/csrf` and send
//! it as `X-CSRF-Token`. Non-success responses are turned into
//! [`ClientError::Api`] carrying the server's message.
//!
//! ```ignore
//! let mut client = ApiClient::new("http://localhost:3000")?;
//! client.login("anna@example.com", "secret").await?;
//! let album = client.create_album("Ceremony").await?;
//! ```

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::account::{PublicUser, ShareMode, CSRF_HEADER};
use crate::album::{AlbumView, EnsuredShare, ShareInfo};
use crate::error::ClientError;
use crate::photo::UploadFile;
use crate::server::{
    AlbumPhotosResponse, CreateAlbumRequest, CreateAlbumResponse, CsrfResponse,
    DeletePhotoResponse, DownloadSelectedRequest, EnsureShareRequest, ErrorResponse,
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    ShareAccessRequest, ShareAccessResponse, SuccessResponse, TrackShareRequest, UploadResponse,
};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the buffer reserved up front from `Content-Length`.
const MAX_PREALLOC_BYTES: u64 = 16 * 1024 * 1024;

/// Progress of a streamed download, reported after every received chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes received so far
    pub received: u64,
    /// Announced size from `Content-Length`, if the server sent one
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Completed share in `[0, 1]`, or `None` when the size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.received as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Client for a running gallery server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// Forget the session token.
    pub fn logout(&mut self) {
        self.token = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        if self.token.is_none() {
            return Err(ClientError::NotLoggedIn);
        }
        Ok(self.request(method, path))
    }

    /// An authenticated request carrying a fresh CSRF token.
    async fn mutating(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let builder = self.authed(method, path)?;
        let csrf = self.fetch_csrf().await?;
        Ok(builder.header(CSRF_HEADER, csrf))
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Fetch a CSRF token for a mutating request.
    pub async fn fetch_csrf(&self) -> Result<String, ClientError> {
        let response: CsrfResponse =
            decode(self.request(Method::GET, "/auth/csrf").send().await?).await?;
        Ok(response.csrf_token)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<RegisterResponse, ClientError> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.map(|n| n.to_string()),
        };
        decode(self.request(Method::POST, "/auth/register").json(&body).send().await?).await
    }

    /// Log in and keep the returned token for later calls.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse =
            decode(self.http.post(self.url("/auth/login")).json(&body).send().await?).await?;

        let token = response.token.clone().ok_or(ClientError::MissingToken)?;
        self.token = Some(token);
        debug!(base_url = %self.base_url, "Logged in");
        Ok(response)
    }

    pub async fn me(&self) -> Result<PublicUser, ClientError> {
        decode(self.authed(Method::GET, "/auth/me")?.send().await?).await
    }

    // =========================================================================
    // Albums
    // =========================================================================

    pub async fn my_albums(&self) -> Result<Vec<AlbumView>, ClientError> {
        decode(self.authed(Method::GET, "/albums/mine")?.send().await?).await
    }

    pub async fn create_album(&self, title: &str) -> Result<AlbumView, ClientError> {
        let body = CreateAlbumRequest {
            title: title.to_string(),
        };
        let response: CreateAlbumResponse =
            decode(self.mutating(Method::POST, "/albums").await?.json(&body).send().await?).await?;
        Ok(response.album)
    }

    pub async fn remove_album(&self, album_id: &str) -> Result<(), ClientError> {
        let path = format!("/albums/{}", urlencoding::encode(album_id));
        let response = self.mutating(Method::DELETE, &path).await?.send().await?;
        let _: SuccessResponse = decode(response).await?;
        Ok(())
    }

    pub async fn album_photos(&self, album_id: &str) -> Result<AlbumPhotosResponse, ClientError> {
        let path = format!("/albums/{}/photos", urlencoding::encode(album_id));
        decode(self.authed(Method::GET, &path)?.send().await?).await
    }

    // =========================================================================
    // Share Links
    // =========================================================================

    /// Get the album's live share link, creating one if needed.
    pub async fn ensure_share_link(
        &self,
        album_id: &str,
        password: Option<&str>,
    ) -> Result<EnsuredShare, ClientError> {
        let path = format!("/albums/{}/share/ensure", urlencoding::encode(album_id));
        let body = EnsureShareRequest {
            password: password.map(|p| p.to_string()),
        };
        decode(self.mutating(Method::POST, &path).await?.json(&body).send().await?).await
    }

    pub async fn revoke_share_link(&self, album_id: &str) -> Result<(), ClientError> {
        let path = format!("/albums/{}/share", urlencoding::encode(album_id));
        let response = self.mutating(Method::DELETE, &path).await?.send().await?;
        let _: SuccessResponse = decode(response).await?;
        Ok(())
    }

    /// Record that the album was shared on `channel`.
    pub async fn track_share(
        &self,
        album_id: &str,
        channel: &str,
        ok: bool,
        meta: Option<serde_json::Value>,
    ) -> Result<(), ClientError> {
        let path = format!("/albums/{}/share/track", urlencoding::encode(album_id));
        let body = TrackShareRequest {
            channel: channel.to_string(),
            ok,
            meta,
        };
        let _: SuccessResponse =
            decode(self.mutating(Method::POST, &path).await?.json(&body).send().await?).await?;
        Ok(())
    }

    pub async fn share_info(
        &self,
        album_id: &str,
        share_id: &str,
    ) -> Result<ShareInfo, ClientError> {
        let path = format!(
            "/albums/{}/share/{}",
            urlencoding::encode(album_id),
            urlencoding::encode(share_id)
        );
        decode(self.http.get(self.url(&path)).send().await?).await
    }

    /// Open a share link and keep the guest token for later calls.
    pub async fn access_share(
        &mut self,
        album_id: &str,
        share_id: &str,
        mode: ShareMode,
        password: Option<&str>,
    ) -> Result<ShareAccessResponse, ClientError> {
        let path = format!(
            "/albums/{}/share/{}/access",
            urlencoding::encode(album_id),
            urlencoding::encode(share_id)
        );
        let body = ShareAccessRequest {
            mode,
            password: password.map(|p| p.to_string()),
        };
        let response: ShareAccessResponse =
            decode(self.http.post(self.url(&path)).json(&body).send().await?).await?;

        self.token = Some(response.token.clone());
        Ok(response)
    }

    // =========================================================================
    // Photos
    // =========================================================================

    /// Every stored photo URL, newest first.
    pub async fn photos(&self) -> Result<Vec<String>, ClientError> {
        decode(self.authed(Method::GET, "/photos")?.send().await?).await
    }

    /// Upload files, optionally into an album with a chosen cover.
    pub async fn upload_photos(
        &self,
        files: Vec<UploadFile>,
        album_id: Option<&str>,
        cover_index: Option<usize>,
    ) -> Result<UploadResponse, ClientError> {
        let mut form = Form::new();
        for file in files {
            let mut part = Part::bytes(file.data.to_vec()).file_name(file.name);
            if let Some(ref content_type) = file.content_type {
                part = part.mime_str(content_type)?;
            }
            form = form.part("photos", part);
        }
        if let Some(album_id) = album_id {
            form = form.text("albumId", album_id.to_string());
        }
        if let Some(index) = cover_index {
            form = form.text("coverIndex", index.to_string());
        }

        decode(self.mutating(Method::POST, "/upload").await?.multipart(form).send().await?).await
    }

    pub async fn delete_photo(&self, filename: &str) -> Result<DeletePhotoResponse, ClientError> {
        let path = format!("/photos/{}", urlencoding::encode(filename));
        decode(self.mutating(Method::DELETE, &path).await?.send().await?).await
    }

    /// Fetch the bytes of a stored photo.
    pub async fn image(&self, filename: &str) -> Result<Bytes, ClientError> {
        let path = format!("/images/{}", urlencoding::encode(filename));
        Ok(check(self.http.get(self.url(&path)).send().await?).await?.bytes().await?)
    }

    /// Zip of the selected photos.
    pub async fn download_selected(&self, filenames: &[String]) -> Result<Bytes, ClientError> {
        self.download_selected_with_progress(filenames, |_| {}).await
    }

    /// Like [`download_selected`](Self::download_selected), calling
    /// `on_progress` as the archive streams in.
    pub async fn download_selected_with_progress(
        &self,
        filenames: &[String],
        on_progress: impl FnMut(DownloadProgress),
    ) -> Result<Bytes, ClientError> {
        let body = DownloadSelectedRequest {
            filenames: filenames.to_vec(),
        };
        let response = self
            .authed(Method::POST, "/download-selected")?
            .json(&body)
            .send()
            .await?;
        collect_stream(check(response).await?, on_progress).await
    }

    /// Zip of every stored photo.
    pub async fn download_all(&self) -> Result<Bytes, ClientError> {
        self.download_all_with_progress(|_| {}).await
    }

    /// Like [`download_all`](Self::download_all), calling `on_progress` as
    /// the archive streams in.
    pub async fn download_all_with_progress(
        &self,
        on_progress: impl FnMut(DownloadProgress),
    ) -> Result<Bytes, ClientError> {
        let response = self.authed(Method::GET, "/download-all")?.send().await?;
        collect_stream(check(response).await?, on_progress).await
    }
}

/// Read a response body chunk by chunk, reporting progress after each one.
async fn collect_stream(
    response: Response,
    mut on_progress: impl FnMut(DownloadProgress),
) -> Result<Bytes, ClientError> {
    let total = response.content_length();
    let mut data = BytesMut::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC_BYTES) as usize);

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        data.extend_from_slice(&chunk?);
        on_progress(DownloadProgress {
            received: data.len() as u64,
            total,
        });
    }

    debug!(bytes = data.len(), "Download complete");
    Ok(data.freeze())
}

/// Pass through success responses; turn others into [`ClientError::Api`].
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) => error.message,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };
    debug!(status = status.as_u16(), message = %message, "API request failed");

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    Ok(check(response).await?.json::<T>().await?)
}
