//! Router configuration for the gallery API.
//!
//! # Route Structure
//!
//! ```text
//! /health                                  - Health check (public)
//! /auth/csrf                               - Issue CSRF token (public)
//! /auth/register, /auth/login              - Credentials exchange (public, POST only)
//! /auth/me                                 - Current user (bearer)
//! /albums/mine, /albums, /albums/{id}      - Album management (bearer)
//! /albums/{id}/photos                      - Album photos (owner or guest)
//! /albums/{id}/share/...                   - Share links (owner) and access (public)
//! /photos, /photos/{name}, /upload         - Photo management (bearer)
//! /images/{name}                           - Photo bytes (public, cached)
//! /download-all, /download-selected        - Zip downloads (bearer)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wedding_gallery::config::Settings;
//! use wedding_gallery::server::{create_router, AppState, RouterConfig};
//! use wedding_gallery::storage::MemoryObjectStore;
//!
//! let settings = Settings::new("a-long-development-secret");
//! let state = AppState::new(Arc::new(MemoryObjectStore::new()), &settings)?;
//! let router = create_router(state, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use http::header::{HeaderName, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::albums::{
    album_photos_handler, create_album_handler, delete_album_handler, ensure_share_handler,
    my_albums_handler, revoke_share_handler, share_access_handler, share_info_handler,
    track_share_handler,
};
use super::auth::{csrf_handler, login_handler, me_handler, register_handler};
use super::handlers::{health_handler, method_not_allowed_handler, AppState};
use super::photos::{
    delete_photo_handler, download_all_handler, download_selected_handler, image_handler,
    list_photos_handler, upload_handler,
};
use crate::account::CSRF_HEADER;
use crate::config::DEFAULT_MAX_BODY_MB;
use crate::storage::ObjectStore;

const DEFAULT_MAX_BODY_BYTES: usize = (DEFAULT_MAX_BODY_MB as usize) * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Largest accepted request body in bytes (uploads included)
    pub max_body_bytes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    /// - Request bodies up to 200MB are accepted
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the request body limit in bytes.
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Authentication is enforced per handler through the [`AuthUser`] and
/// [`CsrfChecked`] extractors, so public and protected routes share one
/// router.
///
/// [`AuthUser`]: super::auth::AuthUser
/// [`CsrfChecked`]: super::auth::CsrfChecked
pub fn create_router<S>(state: AppState<S>, config: RouterConfig) -> Router
where
    S: ObjectStore + 'static,
{
    let cors = build_cors_layer(&config);

    let auth_routes = Router::new()
        .route("/csrf", get(csrf_handler::<S>))
        .route(
            "/register",
            post(register_handler::<S>).fallback(method_not_allowed_handler),
        )
        .route(
            "/login",
            post(login_handler::<S>).fallback(method_not_allowed_handler),
        )
        .route("/me", get(me_handler::<S>));

    let album_routes = Router::new()
        .route("/mine", get(my_albums_handler::<S>))
        .route("/{id}", delete(delete_album_handler::<S>))
        .route("/{id}/photos", get(album_photos_handler::<S>))
        .route("/{id}/share", delete(revoke_share_handler::<S>))
        .route("/{id}/share/ensure", post(ensure_share_handler::<S>))
        .route("/{id}/share/track", post(track_share_handler::<S>))
        .route("/{id}/share/{shareId}", get(share_info_handler::<S>))
        .route(
            "/{id}/share/{shareId}/access",
            post(share_access_handler::<S>),
        );

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/auth", auth_routes)
        .route("/albums", post(create_album_handler::<S>))
        .nest("/albums", album_routes)
        .route("/photos", get(list_photos_handler::<S>))
        .route("/photos/{name}", delete(delete_photo_handler::<S>))
        .route("/upload", post(upload_handler::<S>))
        .route("/images/{name}", get(image_handler::<S>))
        .route("/download-all", get(download_all_handler::<S>))
        .route("/download-selected", post(download_selected_handler::<S>))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
        ])
        .expose_headers([CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
