//! Sparkles - content service for the Tiffany Sparkles site
//!
//! Serves the rendered section documents to the public site, the editing
//! API to the admin dashboard, and the object storage routes media is
//! uploaded to and served from.
//!
//! Features:
//! - Visitor reads that always render (stored content or defaults)
//! - Versioned saves with conflict detection
//! - Pre-signed media uploads and public object URLs
//! - Sweeping of media no document references

pub mod auth;
pub mod server;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use cms_core::dst::{Clock, SystemClock};
use cms_core::media::{FsMediaStore, WebpTranscoder};
use cms_core::storage::{ContentStore, FileContentStore};
use cms_core::{CmsConfig, ContentClient};

use crate::auth::StaticSessionVerifier;
use crate::server::AppState;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Default HTTP bind address
pub const HTTP_BIND_ADDRESS_DEFAULT: &str = "127.0.0.1:8080";

/// Application name
pub const APP_NAME: &str = "sparkles";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Media directory inside the data directory
pub const MEDIA_DIR_NAME: &str = "media";

// =============================================================================
// CLI
// =============================================================================

/// Sparkles - content service for the Tiffany Sparkles site
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Serve section content, the admin editing API and media storage")]
#[command(version)]
struct Cli {
    /// HTTP bind address
    #[arg(short, long, default_value = HTTP_BIND_ADDRESS_DEFAULT)]
    bind: String,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory for the content table and media bucket
    #[arg(long, default_value = "~/.sparkles")]
    data_dir: String,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("Sparkles v{}", APP_VERSION);

    let config = CmsConfig::from_env()?;

    // Expand data directory
    let data_dir = shellexpand::tilde(&cli.data_dir).to_string();
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = open_content_store(&config, Path::new(&data_dir), clock.clone()).await?;
    let media = FsMediaStore::open(
        &Path::new(&data_dir).join(MEDIA_DIR_NAME),
        &config.bucket,
        &config.public_base_url,
        clock.clone(),
    )
    .await?;
    let client = ContentClient::new(store, Arc::new(media), clock)
        .with_transcoder(Arc::new(WebpTranscoder::new(config.webp_quality)));

    if config.admin_tokens.is_empty() {
        tracing::warn!("SPARKLES_ADMIN_TOKENS is empty; admin routes will reject every request");
    }
    let state = AppState {
        client,
        verifier: Arc::new(StaticSessionVerifier::new(config.admin_tokens.clone())),
        config: Arc::new(config),
    };

    tracing::info!("Starting HTTP server on {}", cli.bind);
    let addr: std::net::SocketAddr = cli.bind.parse()?;
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "postgres")]
async fn open_content_store(
    config: &CmsConfig,
    data_dir: &Path,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Arc<dyn ContentStore>> {
    if let Some(url) = &config.database_url {
        tracing::info!("Content store: postgres");
        let store = cms_core::storage::PostgresContentStore::new(url, clock).await?;
        return Ok(Arc::new(store));
    }
    tracing::info!("Content store: file");
    Ok(Arc::new(FileContentStore::open(data_dir, clock).await?))
}

#[cfg(not(feature = "postgres"))]
async fn open_content_store(
    config: &CmsConfig,
    data_dir: &Path,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Arc<dyn ContentStore>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but this build has no postgres support; using the file store");
    }
    tracing::info!("Content store: file");
    Ok(Arc::new(FileContentStore::open(data_dir, clock).await?))
}
