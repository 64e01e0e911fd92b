//! HTTP server layer for the gallery.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │    /auth/*   /albums/*   /photos   /upload   /images/{name}     │
//! │                                                                 │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌─────────────────┐  │
//! │  │   auth   │  │  albums  │  │  photos  │  │     routes      │  │
//! │  │ (jwt,    │  │ (shares) │  │ (upload, │  │ (router config, │  │
//! │  │  csrf)   │  │          │  │  zips)   │  │  cors, tracing) │  │
//! │  └──────────┘  └──────────┘  └──────────┘  └─────────────────┘  │
//! │        handlers: shared state and error → JSON mapping          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod albums;
pub mod auth;
pub mod extract;
pub mod handlers;
pub mod photos;
pub mod routes;

pub use albums::{
    AlbumPhotosResponse, CreateAlbumRequest, CreateAlbumResponse, EnsureShareRequest,
    ShareAccessRequest, ShareAccessResponse, TrackShareRequest,
};
pub use auth::{
    bearer_token, AuthUser, CsrfChecked, CsrfResponse, LoginRequest, LoginResponse,
    RegisterRequest, RegisterResponse, RegisteredUser, ACCESS_TOKEN_PARAM,
};
pub use extract::JsonBody;
pub use handlers::{health_handler, AppState, ErrorResponse, HealthResponse, SuccessResponse};
pub use photos::{DeletePhotoResponse, DownloadSelectedRequest, UploadResponse};
pub use routes::{create_router, RouterConfig};
