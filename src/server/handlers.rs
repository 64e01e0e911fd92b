//! Shared state, error mapping and the health endpoint.
//!
//! Every error the services raise is turned into a JSON body of the form
//!
//! ```json
//! { "error": "invalid_credentials", "message": "Invalid credentials", "status": 401 }
//! ```
//!
//! and logged at a level matching its severity.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::account::{AccountService, CsrfGuard, PasswordHasher, TokenIssuer};
use crate::album::AlbumService;
use crate::config::Settings;
use crate::error::{AlbumError, AuthError, PhotoError, StoreError};
use crate::photo::{ImageCache, PhotoService};
use crate::storage::ObjectStore;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to all handlers.
pub struct AppState<S: ObjectStore> {
    pub accounts: Arc<AccountService<S>>,
    pub albums: Arc<AlbumService<S>>,
    pub photos: Arc<PhotoService<S>>,
    pub tokens: Arc<TokenIssuer>,
    pub csrf: Arc<CsrfGuard>,

    /// Whether mutating requests must carry a CSRF token
    pub csrf_enabled: bool,

    /// Lifetime of newly created share links
    pub share_ttl: Duration,

    /// Cache-Control max-age for photos, in seconds
    pub cache_max_age: u32,
}

impl<S: ObjectStore> AppState<S> {
    /// Wire up all services over one store.
    pub fn new(store: Arc<S>, settings: &Settings) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(settings.hash_cost)?;
        let tokens = TokenIssuer::new(&settings.jwt_secret, settings.token_ttl);
        let base_url = settings.public_base_url.as_deref();

        Ok(Self {
            accounts: Arc::new(AccountService::new(Arc::clone(&store), hasher.clone())),
            albums: Arc::new(AlbumService::new(
                Arc::clone(&store),
                hasher,
                tokens.clone(),
                base_url,
            )),
            photos: Arc::new(PhotoService::new(
                store,
                ImageCache::with_capacity(settings.image_cache_bytes),
                base_url,
                settings.photo_limits,
            )),
            tokens: Arc::new(tokens),
            csrf: Arc::new(CsrfGuard::new(&settings.csrf_secret, settings.csrf_ttl)),
            csrf_enabled: settings.csrf_enabled,
            share_ttl: settings.share_ttl,
            cache_max_age: settings.cache_max_age,
        })
    }
}

impl<S: ObjectStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            albums: Arc::clone(&self.albums),
            photos: Arc::clone(&self.photos),
            tokens: Arc::clone(&self.tokens),
            csrf: Arc::clone(&self.csrf),
            csrf_enabled: self.csrf_enabled,
            share_ttl: self.share_ttl,
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }

    /// Render as a response with `status`.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body of mutations that return nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

type ErrorParts = (StatusCode, &'static str, String);

fn store_parts(err: &StoreError) -> ErrorParts {
    match err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        StoreError::Connection(_) => (StatusCode::BAD_GATEWAY, "connection_error", err.to_string()),
        StoreError::S3(_) | StoreError::Document { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            err.to_string(),
        ),
    }
}

fn auth_parts(err: &AuthError) -> ErrorParts {
    let message = err.to_string();
    match err {
        AuthError::MissingCredentials => (StatusCode::BAD_REQUEST, "invalid_request", message),
        AuthError::UserExists => (StatusCode::BAD_REQUEST, "user_exists", message),
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "invalid_credentials", message)
        }
        AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "missing_token", message),
        AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "invalid_token", message),
        AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired", message),
        AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", message),
        AuthError::MissingCsrf => (StatusCode::FORBIDDEN, "csrf_missing", message),
        AuthError::InvalidCsrf => (StatusCode::FORBIDDEN, "csrf_invalid", message),
        AuthError::Hashing(_) | AuthError::Signing(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
        }
        AuthError::Store(e) => store_parts(e),
    }
}

fn album_parts(err: &AlbumError) -> ErrorParts {
    let message = err.to_string();
    match err {
        AlbumError::NotFound { .. } => (StatusCode::NOT_FOUND, "album_not_found", message),
        AlbumError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden", message),
        AlbumError::InvalidTitle { .. } => (StatusCode::BAD_REQUEST, "invalid_title", message),
        AlbumError::ShareNotFound => (StatusCode::NOT_FOUND, "share_not_found", message),
        AlbumError::ShareExpired => (StatusCode::GONE, "share_expired", message),
        AlbumError::InvalidSharePassword => {
            (StatusCode::UNAUTHORIZED, "invalid_password", message)
        }
        AlbumError::InvalidShareEvent { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_request", message)
        }
        AlbumError::Auth(e) => auth_parts(e),
        AlbumError::Store(e) => store_parts(e),
    }
}

fn photo_parts(err: &PhotoError) -> ErrorParts {
    let message = err.to_string();
    match err {
        PhotoError::NotFound { .. } => (StatusCode::NOT_FOUND, "photo_not_found", message),
        PhotoError::InvalidName { .. } => (StatusCode::BAD_REQUEST, "invalid_name", message),
        PhotoError::NoFiles => (StatusCode::BAD_REQUEST, "no_files", message),
        PhotoError::Rejected(_) => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "upload_rejected",
            message,
        ),
        PhotoError::InvalidUpload(_) => (StatusCode::BAD_REQUEST, "invalid_upload", message),
        PhotoError::EmptySelection => (StatusCode::BAD_REQUEST, "empty_selection", message),
        PhotoError::ArchiveTooLarge { .. } => {
            (StatusCode::PAYLOAD_TOO_LARGE, "selection_too_large", message)
        }
        PhotoError::Archive(_) => (StatusCode::INTERNAL_SERVER_ERROR, "archive_error", message),
        PhotoError::Album(e) => album_parts(e),
        PhotoError::Store(e) => store_parts(e),
    }
}

/// Log an error by severity and render it.
///
/// - 5xx at ERROR
/// - rejected credentials, tokens and CSRF at WARN
/// - everything else (missing/expired tokens, 404s, validation) at DEBUG
fn respond((status, error_type, message): ErrorParts) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if matches!(
        error_type,
        "invalid_credentials" | "invalid_token" | "csrf_invalid" | "invalid_password" | "forbidden"
    ) {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Rejected request: {}",
            message
        );
    } else {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    ErrorResponse::with_status(error_type, message, status).into_response_with(status)
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        respond(store_parts(&self))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        respond(auth_parts(&self))
    }
}

impl IntoResponse for AlbumError {
    fn into_response(self) -> Response {
        respond(album_parts(&self))
    }
}

impl IntoResponse for PhotoError {
    fn into_response(self) -> Response {
        respond(photo_parts(&self))
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /health`
///
/// ```json
/// { "status": "healthy", "version": "0.1.0" }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for unsupported verbs on the auth endpoints.
pub async fn method_not_allowed_handler() -> Response {
    let status = StatusCode::METHOD_NOT_ALLOWED;
    ErrorResponse::with_status("method_not_allowed", "Method not allowed", status)
        .into_response_with(status)
}

// =============================================================================
// Tests
// =============================================================================
