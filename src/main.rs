//! Wedding Gallery - a photo-sharing server for wedding albums.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wedding_gallery::{
    account::TokenIssuer,
    config::{
        CheckConfig, Cli, Command, ServeConfig, StorageBackend, TokenConfig, TokenOutputFormat,
    },
    create_s3_client,
    server::{create_router, AppState, RouterConfig},
    storage::{MemoryObjectStore, ObjectStore, S3ObjectStore, IMAGES_PREFIX},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    info!("Configuration:");
    match config.storage {
        StorageBackend::S3 => {
            info!("  Storage: S3 bucket '{}'", config.bucket());
            if let Some(ref prefix) = config.s3_prefix {
                info!("  S3 prefix: {}", prefix);
            }
            if let Some(ref endpoint) = config.s3_endpoint {
                info!("  S3 endpoint: {}", endpoint);
            }
            info!("  S3 region: {}", config.s3_region);
        }
        StorageBackend::Memory => {
            warn!("  Storage: MEMORY - accounts, albums and photos are lost on restart");
        }
    }
    if let Some(ref url) = config.public_url {
        info!("  Public URL: {}", url);
    }
    info!(
        "  Tokens: {}s bearer, {}s CSRF, {} day share links",
        config.token_ttl, config.csrf_ttl, config.share_ttl_days
    );
    if !config.csrf_enabled {
        warn!("  CSRF: DISABLED - mutating requests are not checked");
    }
    info!(
        "  Limits: {}MB per photo, {}MB per selection download, {}MB full download",
        config.max_upload_mb, config.max_archive_mb, config.max_download_all_mb
    );
    info!("  Cache: {}MB photos", config.cache_bytes / (1024 * 1024));

    match config.storage {
        StorageBackend::Memory => serve(Arc::new(MemoryObjectStore::new()), &config).await,
        StorageBackend::S3 => {
            let bucket = config.bucket();
            let s3_client =
                create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
            let store =
                S3ObjectStore::new(s3_client.clone(), bucket.clone(), config.s3_prefix.clone());

            info!("");
            info!("Connecting to S3...");
            match test_s3_connection(&s3_client, &bucket, store.prefix()).await {
                Ok(photo_count) => {
                    info!("  Connected successfully");
                    info!("  Found {} photo(s) in {}", photo_count, store.identifier());
                }
                Err(e) => {
                    error!("  Failed to connect to S3: {}", e);
                    error!("");
                    error!("  Please check:");
                    error!("    - Your AWS credentials are configured correctly");
                    error!("    - The bucket '{}' exists and is accessible", bucket);
                    error!("    - The S3 endpoint is correct (if using MinIO/custom S3)");
                    error!("    - Or run with --storage=memory for local testing");
                    return ExitCode::FAILURE;
                }
            }

            serve(Arc::new(store), &config).await
        }
    }
}

/// Build the application over `store` and serve it until shutdown.
async fn serve<S: ObjectStore + 'static>(store: Arc<S>, config: &ServeConfig) -> ExitCode {
    let state = match AppState::new(store, &config.settings()) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialise services: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(state, build_router_config(config));
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/auth/csrf", addr);
    info!("");
    info!("  Create an account:");
    info!(
        "    curl -X POST http://{}/auth/register -H 'Content-Type: application/json' \\",
        addr
    );
    info!("         -d '{{\"email\":\"you@example.com\",\"password\":\"...\"}}'");
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!(" ██████╗  █████╗ ██╗     ██╗     ███████╗██████╗ ██╗   ██╗");
    info!("██╔════╝ ██╔══██╗██║     ██║     ██╔════╝██╔══██╗╚██╗ ██╔╝");
    info!("██║  ███╗███████║██║     ██║     █████╗  ██████╔╝ ╚████╔╝ ");
    info!("██║   ██║██╔══██║██║     ██║     ██╔══╝  ██╔══██╗  ╚██╔╝  ");
    info!("╚██████╔╝██║  ██║███████╗███████╗███████╗██║  ██║   ██║   ");
    info!(" ╚═════╝ ╚═╝  ╚═╝╚══════╝╚══════╝╚══════╝╚═╝  ╚═╝   ╚═╝   ");
    info!("");
    info!("                    wedding gallery v{}", version);
}

/// Test S3 connectivity and count stored photos.
async fn test_s3_connection(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
) -> Result<usize, String> {
    let result = client
        .list_objects_v2()
        .bucket(bucket)
        .prefix(format!("{}{}", prefix, IMAGES_PREFIX))
        .max_keys(1000)
        .send()
        .await
        .map_err(|e| format!("{}", e))?;

    Ok(result.contents().len())
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wedding_gallery=debug,tower_http=debug"
    } else {
        "wedding_gallery=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_max_body_bytes(config.max_body_bytes())
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let issuer = TokenIssuer::new(&config.secret, Duration::from_secs(config.ttl));
    let token = match issuer.issue_user(&config.user_id, &config.email) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        TokenOutputFormat::Token => {
            println!("{}", token);
        }
        TokenOutputFormat::Json => {
            let claims = match issuer.decode_claims(&token) {
                Ok(claims) => claims,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            let json = serde_json::json!({
                "token": token,
                "sub": claims.sub,
                "email": claims.email,
                "exp": claims.exp,
                "ttl": config.ttl,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Wedding Gallery Configuration Check");
    println!("═══════════════════════════════════");
    println!();

    let bucket = match config.resolve_bucket() {
        Ok(b) => {
            println!("✓ Bucket: {}", b);
            b
        }
        Err(e) => {
            println!("✗ Bucket: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref prefix) = config.s3_prefix {
        println!("✓ Prefix: {}", prefix);
    }
    if let Some(ref endpoint) = config.s3_endpoint {
        println!("✓ Endpoint: {}", endpoint);
    }
    println!("✓ Region: {}", config.s3_region);
    println!();

    print!("Testing S3 connection... ");

    let s3_client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;

    match s3_client
        .list_objects_v2()
        .bucket(&bucket)
        .max_keys(1)
        .send()
        .await
    {
        Ok(_) => {
            println!("✓ success");
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - Your AWS credentials are configured correctly");
            println!("  - The bucket '{}' exists and is accessible", bucket);
            if config.s3_endpoint.is_some() {
                println!("  - The S3 endpoint is correct and reachable");
            }
            return ExitCode::FAILURE;
        }
    }

    if config.list_photos {
        println!();
        println!("Photos in bucket:");
        println!("─────────────────");

        let store = S3ObjectStore::new(s3_client, bucket, config.s3_prefix.clone());
        match store.list(IMAGES_PREFIX).await {
            Ok(keys) => {
                if keys.is_empty() {
                    println!("  (no photos found)");
                } else {
                    for key in &keys {
                        println!("  {}", key.trim_start_matches(IMAGES_PREFIX));
                    }
                    println!();
                    println!("Total: {} photo(s)", keys.len());
                }
            }
            Err(e) => {
                println!("  Error listing photos: {}", e);
            }
        }
    }

    println!();
    println!("═══════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
