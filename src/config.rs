//! Configuration management for the wedding gallery server.
//!
//! Options come from command-line arguments or environment variables with
//! the `GALLERY_` prefix, with defaults for everything except secrets.
//!
//! # Commands
//!
//! - `serve` (default): run the HTTP server
//! - `token`: mint a bearer token offline for scripting and support
//! - `check`: verify storage connectivity
//!
//! # Environment Variables
//!
//! - `GALLERY_HOST` / `GALLERY_PORT` - bind address (default: 0.0.0.0:3000)
//! - `GALLERY_STORAGE` - `s3` or `memory` (default: s3)
//! - `GALLERY_S3_BUCKET` - bucket holding photos and documents
//! - `GALLERY_S3_PREFIX` - key prefix inside the bucket
//! - `GALLERY_S3_ENDPOINT` - custom endpoint for S3-compatible services
//! - `GALLERY_S3_REGION` - AWS region (default: us-east-1)
//! - `GALLERY_JWT_SECRET` - bearer token signing secret (required)
//! - `GALLERY_CSRF_SECRET` - CSRF signing secret (defaults to the JWT secret)
//! - `GALLERY_PUBLIC_URL` - base URL used in photo and share links
//! - `GALLERY_CORS_ORIGINS` - comma-separated allowed origins

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::account::HashCost;
use crate::photo::{PhotoLimits, DEFAULT_IMAGE_CACHE_CAPACITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default bearer token lifetime in seconds (1 hour).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Default CSRF token lifetime in seconds (2 hours).
pub const DEFAULT_CSRF_TTL_SECS: u64 = 7200;

/// Default share link lifetime in days.
pub const DEFAULT_SHARE_TTL_DAYS: u64 = 30;

/// Default per-file upload limit in MB.
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 20;

/// Default selected-photo archive limit in MB.
pub const DEFAULT_MAX_ARCHIVE_MB: u64 = 100;

/// Default full-gallery download limit in MB.
pub const DEFAULT_MAX_DOWNLOAD_ALL_MB: u64 = 1024;

/// Default largest request body in MB (one multipart upload of several photos).
pub const DEFAULT_MAX_BODY_MB: u64 = 200;

/// Default HTTP cache max-age for photos in seconds (1 day).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 86_400;

/// Shortest accepted signing secret.
const MIN_SECRET_LEN: usize = 16;

const MB: u64 = 1024 * 1024;

// =============================================================================
// CLI
// =============================================================================

/// Wedding Gallery - share wedding photos with your guests.
///
/// Accounts, albums, uploads, zip downloads and password-protected share
/// links, with photos stored in S3 or any S3-compatible service.
#[derive(Parser, Debug, Clone)]
#[command(name = "wedding-gallery")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Serve options, used when no subcommand is given.
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// The command to run; `serve` when none was given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),

    /// Mint a user bearer token.
    Token(TokenConfig),

    /// Check storage configuration and connectivity.
    Check(CheckConfig),
}

/// Where photos and documents are stored.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// S3 or an S3-compatible service
    #[default]
    S3,
    /// Process memory; everything is lost on restart
    Memory,
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GALLERY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GALLERY_PORT")]
    pub port: u16,

    /// Public base URL of the API, used to build photo and share links.
    ///
    /// Without it links are root-relative (`/images/...`).
    #[arg(long, env = "GALLERY_PUBLIC_URL")]
    pub public_url: Option<String>,

    // =========================================================================
    // Storage
    // =========================================================================
    /// Storage backend.
    #[arg(long, value_enum, default_value_t = StorageBackend::S3, env = "GALLERY_STORAGE")]
    pub storage: StorageBackend,

    /// S3 bucket holding photos and documents.
    #[arg(long, env = "GALLERY_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Key prefix inside the bucket.
    #[arg(long, env = "GALLERY_S3_PREFIX")]
    pub s3_prefix: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "GALLERY_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "GALLERY_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Authentication
    // =========================================================================
    /// Secret used to sign bearer tokens.
    #[arg(long, env = "GALLERY_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Bearer token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS, env = "GALLERY_TOKEN_TTL")]
    pub token_ttl: u64,

    /// Secret used to sign CSRF tokens. Defaults to the JWT secret.
    #[arg(long, env = "GALLERY_CSRF_SECRET", hide_env_values = true)]
    pub csrf_secret: Option<String>,

    /// CSRF token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_CSRF_TTL_SECS, env = "GALLERY_CSRF_TTL")]
    pub csrf_ttl: u64,

    /// Require an X-CSRF-Token header on mutating requests.
    #[arg(long, default_value_t = true, env = "GALLERY_CSRF_ENABLED", action = clap::ArgAction::Set)]
    pub csrf_enabled: bool,

    /// Argon2 memory cost in KiB.
    #[arg(long, default_value_t = HashCost::default().memory_kib, env = "GALLERY_HASH_MEMORY_KIB")]
    pub hash_memory_kib: u32,

    /// Argon2 iterations.
    #[arg(long, default_value_t = HashCost::default().iterations, env = "GALLERY_HASH_ITERATIONS")]
    pub hash_iterations: u32,

    /// Share link lifetime in days.
    #[arg(long, default_value_t = DEFAULT_SHARE_TTL_DAYS, env = "GALLERY_SHARE_TTL_DAYS")]
    pub share_ttl_days: u64,

    // =========================================================================
    // Photos
    // =========================================================================
    /// Largest accepted photo in MB.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_MB, env = "GALLERY_MAX_UPLOAD_MB")]
    pub max_upload_mb: u64,

    /// Largest selected-photo zip download in MB.
    #[arg(long, default_value_t = DEFAULT_MAX_ARCHIVE_MB, env = "GALLERY_MAX_ARCHIVE_MB")]
    pub max_archive_mb: u64,

    /// Largest full-gallery zip download in MB.
    #[arg(long, default_value_t = DEFAULT_MAX_DOWNLOAD_ALL_MB, env = "GALLERY_MAX_DOWNLOAD_ALL_MB")]
    pub max_download_all_mb: u64,

    /// Largest request body in MB.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_MB, env = "GALLERY_MAX_BODY_MB")]
    pub max_body_mb: u64,

    /// In-memory photo cache size in bytes.
    #[arg(long, default_value_t = DEFAULT_IMAGE_CACHE_CAPACITY, env = "GALLERY_CACHE_BYTES")]
    pub cache_bytes: usize,

    /// HTTP Cache-Control max-age for photos in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "GALLERY_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS and Logging
    // =========================================================================
    /// Allowed CORS origins (comma-separated). Any origin when unset.
    #[arg(long, env = "GALLERY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

/// Runtime settings consumed by the services, derived from [`ServeConfig`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub csrf_secret: String,
    pub csrf_ttl: Duration,
    pub csrf_enabled: bool,
    pub hash_cost: HashCost,
    pub share_ttl: Duration,
    pub public_base_url: Option<String>,
    pub photo_limits: PhotoLimits,
    pub image_cache_bytes: usize,
    pub cache_max_age: u32,
}

impl Settings {
    /// Settings with defaults for everything but the secret.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            csrf_secret: secret.clone(),
            jwt_secret: secret,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            csrf_ttl: Duration::from_secs(DEFAULT_CSRF_TTL_SECS),
            csrf_enabled: true,
            hash_cost: HashCost::default(),
            share_ttl: Duration::from_secs(DEFAULT_SHARE_TTL_DAYS * 24 * 3600),
            public_base_url: None,
            photo_limits: PhotoLimits::default(),
            image_cache_bytes: DEFAULT_IMAGE_CACHE_CAPACITY,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match self.jwt_secret.as_deref() {
            None | Some("") => {
                return Err(
                    "A JWT secret is required. Set --jwt-secret or GALLERY_JWT_SECRET".to_string(),
                )
            }
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(format!(
                    "jwt_secret must be at least {} characters",
                    MIN_SECRET_LEN
                ))
            }
            _ => {}
        }
        if let Some(ref secret) = self.csrf_secret {
            if secret.len() < MIN_SECRET_LEN {
                return Err(format!(
                    "csrf_secret must be at least {} characters",
                    MIN_SECRET_LEN
                ));
            }
        }

        if self.storage == StorageBackend::S3 && self.bucket().is_empty() {
            return Err(
                "S3 bucket name is required. Set --s3-bucket or GALLERY_S3_BUCKET, \
                 or use --storage=memory for local testing"
                    .to_string(),
            );
        }

        if self.token_ttl == 0 {
            return Err("token_ttl must be greater than 0".to_string());
        }
        if self.csrf_ttl == 0 {
            return Err("csrf_ttl must be greater than 0".to_string());
        }
        if self.share_ttl_days == 0 {
            return Err("share_ttl_days must be greater than 0".to_string());
        }

        if self.max_upload_mb == 0 || self.max_archive_mb == 0 || self.max_download_all_mb == 0 {
            return Err("upload and archive limits must be greater than 0".to_string());
        }
        if self.max_body_mb < self.max_upload_mb {
            return Err("max_body_mb must be at least max_upload_mb".to_string());
        }

        if let Some(ref url) = self.public_url {
            url::Url::parse(url).map_err(|e| format!("Invalid public_url '{}': {}", url, e))?;
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured bucket, or empty.
    pub fn bucket(&self) -> String {
        self.s3_bucket.clone().unwrap_or_default()
    }

    /// Largest request body in bytes.
    pub fn max_body_bytes(&self) -> usize {
        (self.max_body_mb * MB) as usize
    }

    /// Build runtime [`Settings`]. Call [`validate`](Self::validate) first.
    pub fn settings(&self) -> Settings {
        let jwt_secret = self.jwt_secret.clone().unwrap_or_default();
        Settings {
            csrf_secret: self.csrf_secret.clone().unwrap_or_else(|| jwt_secret.clone()),
            jwt_secret,
            token_ttl: Duration::from_secs(self.token_ttl),
            csrf_ttl: Duration::from_secs(self.csrf_ttl),
            csrf_enabled: self.csrf_enabled,
            hash_cost: HashCost {
                memory_kib: self.hash_memory_kib,
                iterations: self.hash_iterations,
            },
            share_ttl: Duration::from_secs(self.share_ttl_days * 24 * 3600),
            public_base_url: self.public_url.clone(),
            photo_limits: PhotoLimits {
                max_upload_bytes: self.max_upload_mb * MB,
                max_archive_bytes: self.max_archive_mb * MB,
                max_download_all_bytes: self.max_download_all_mb * MB,
            },
            image_cache_bytes: self.cache_bytes,
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Token
// =============================================================================

/// Output format of the `token` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenOutputFormat {
    /// The bare token
    #[default]
    Token,
    /// JSON with the token, claims and expiry
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// Secret used to sign bearer tokens.
    #[arg(long, env = "GALLERY_JWT_SECRET", hide_env_values = true)]
    pub secret: String,

    /// User id to put in the `sub` claim.
    #[arg(long)]
    pub user_id: String,

    /// Email to put in the `email` claim.
    #[arg(long)]
    pub email: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub ttl: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl TokenConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("Secret is required. Set --secret or GALLERY_JWT_SECRET".to_string());
        }
        if self.user_id.trim().is_empty() {
            return Err("--user-id must not be empty".to_string());
        }
        if self.ttl == 0 {
            return Err("ttl must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Check
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// S3 bucket to check.
    #[arg(long, env = "GALLERY_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Key prefix inside the bucket.
    #[arg(long, env = "GALLERY_S3_PREFIX")]
    pub s3_prefix: Option<String>,

    /// Custom S3 endpoint URL.
    #[arg(long, env = "GALLERY_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "GALLERY_S3_REGION")]
    pub s3_region: String,

    /// List stored photos.
    #[arg(long, default_value_t = false)]
    pub list_photos: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    /// The bucket to check, or an error if none was configured.
    pub fn resolve_bucket(&self) -> Result<String, String> {
        match self.s3_bucket.as_deref().map(str::trim) {
            Some(bucket) if !bucket.is_empty() => Ok(bucket.to_string()),
            _ => Err("not configured (set --s3-bucket or GALLERY_S3_BUCKET)".to_string()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
