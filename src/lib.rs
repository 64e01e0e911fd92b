//! # Wedding Gallery
//!
//! A photo-sharing server for wedding albums, with photos and documents
//! stored in S3-compatible object storage.
//!
//! ## Features
//!
//! - **Accounts**: registration, Argon2 password hashing, JWT bearer tokens
//! - **Albums**: per-user albums with covers and newest-first photo ordering
//! - **Share links**: expiring, optionally password-protected guest access
//! - **Photos**: validated multipart uploads, cached image serving, zip downloads
//! - **CSRF protection**: stateless HMAC-signed tokens on mutating requests
//! - **Gallery model**: selection, lightbox, keyboard, touch and zoom state
//!
//! ## Architecture
//!
//! - [`storage`] - Object store abstraction (S3 and in-memory) and JSON documents
//! - [`account`] - Users, password hashing, bearer and CSRF tokens
//! - [`album`] - Albums and share links
//! - [`photo`] - Uploads, downloads, image cache and zip archives
//! - [`gallery`] - Client-side gallery interaction model
//! - [`server`] - Axum-based HTTP server and routes
//! - [`client`] - HTTP client for the API
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wedding_gallery::{create_router, AppState, MemoryObjectStore, RouterConfig, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::new("a-long-development-secret");
//!     let state = AppState::new(Arc::new(MemoryObjectStore::new()), &settings)?;
//!     let router = create_router(state, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod album;
pub mod client;
pub mod config;
pub mod error;
pub mod gallery;
pub mod photo;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use account::{
    AccountService, CsrfGuard, HashCost, PasswordHasher, Principal, PublicUser, ShareMode,
    TokenIssuer, User,
};
pub use album::{Album, AlbumService, AlbumView, EnsuredShare, ShareInfo, ShareLink};
pub use client::{ApiClient, DownloadProgress};
pub use config::{
    CheckConfig, Cli, Command, ServeConfig, Settings, StorageBackend, TokenConfig,
    TokenOutputFormat,
};
pub use error::{AlbumError, AuthError, ClientError, PhotoError, StoreError};
pub use gallery::{Gallery, Lightbox, Selection};
pub use photo::{ImageCache, PhotoLimits, PhotoService, UploadFile, UploadReport};
pub use server::{create_router, AppState, ErrorResponse, RouterConfig};
pub use storage::{create_s3_client, MemoryObjectStore, ObjectStore, S3ObjectStore};
