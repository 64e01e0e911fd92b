use thiserror::Error;

/// Errors raised by the object store backing photos and documents.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// A stored document could not be encoded or decoded
    #[error("Document error in {key}: {message}")]
    Document { key: String, message: String },
}

/// Errors from registration, login, bearer tokens and CSRF tokens.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Email or password missing from a register/login body
    #[error("Email and password required")]
    MissingCredentials,

    /// Email already registered
    #[error("User already exists")]
    UserExists,

    /// Unknown email or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No bearer token on a protected request
    #[error("Authentication required")]
    MissingToken,

    /// Bearer token is malformed or its signature does not verify
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Bearer token expired
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but does not grant this operation
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// `X-CSRF-Token` header missing on a mutating request
    #[error("Missing CSRF token")]
    MissingCsrf,

    /// CSRF token malformed, forged or expired
    #[error("Invalid CSRF token")]
    InvalidCsrf,

    /// Password hashing failed
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Token signing failed
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// Backing store failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from album management and share links.
#[derive(Debug, Clone, Error)]
pub enum AlbumError {
    /// No album with this id
    #[error("Album not found: {album_id}")]
    NotFound { album_id: String },

    /// Caller may not read or modify this album
    #[error("Access to album {album_id} denied")]
    Forbidden { album_id: String },

    /// Title empty or too long
    #[error("Invalid title: {reason}")]
    InvalidTitle { reason: String },

    /// Share id does not belong to the album, or sharing is off
    #[error("Share link not found")]
    ShareNotFound,

    /// Share link expired
    #[error("Share link expired")]
    ShareExpired,

    /// Wrong share password
    #[error("Invalid share password")]
    InvalidSharePassword,

    /// Share-tracking payload rejected
    #[error("Invalid share event: {reason}")]
    InvalidShareEvent { reason: String },

    /// Guest token could not be issued
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Backing store failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from photo upload, download and deletion.
#[derive(Debug, Clone, Error)]
pub enum PhotoError {
    /// No stored image with this name
    #[error("Photo not found: {name}")]
    NotFound { name: String },

    /// File name contains path separators or is otherwise unusable
    #[error("Invalid photo name: {name}")]
    InvalidName { name: String },

    /// Upload request had no usable files
    #[error("No photos uploaded")]
    NoFiles,

    /// Every file in an upload was rejected
    #[error("Upload rejected: {0}")]
    Rejected(String),

    /// Multipart body could not be read
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Zip download requested with an empty selection
    #[error("No photos selected")]
    EmptySelection,

    /// Requested photos exceed an archive size limit
    #[error("Archive too large: {total} bytes (limit {limit} bytes)")]
    ArchiveTooLarge { total: u64, limit: u64 },

    /// Building the zip archive failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Album lookup or authorization failed while uploading
    #[error(transparent)]
    Album(#[from] AlbumError),

    /// Backing store failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced by the HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport or decoding failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// Login succeeded but no token came back
    #[error("Token missing from response")]
    MissingToken,

    /// Operation needs a logged-in session
    #[error("Not logged in")]
    NotLoggedIn,
}

impl ClientError {
    /// HTTP status when the server rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
