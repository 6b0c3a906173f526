//! CMS CLI
//!
//! Command-line access to the Sparkles content store and media bucket.
//!
//! # Usage
//!
//! ```bash
//! # List sections and their stored versions
//! cms sections
//!
//! # Print what visitors see for a section
//! cms get hero
//!
//! # Replace a section document
//! cms put featured_products products.json --base-version 3
//!
//! # Upload an image into the second product and save
//! cms upload featured_products 1 cloth.png
//!
//! # Delete unreferenced media older than ten minutes
//! cms gc --grace-secs 600
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cms_core::constants::TIME_MS_PER_SEC;
use cms_core::dst::{Clock, SystemClock};
use cms_core::editor::{save_json, upload_json};
use cms_core::media::{FsMediaStore, WebpTranscoder};
use cms_core::renderer::render_json;
use cms_core::storage::{ContentStore, FileContentStore};
use cms_core::{CmsConfig, ContentClient, MediaFile, MediaTarget, SectionKind, UploadProgress};
use tokio::sync::watch;

/// Media directory inside the data directory
const MEDIA_DIR_NAME: &str = "media";

#[derive(Parser)]
#[command(name = "cms")]
#[command(about = "Sparkles content store CLI", long_about = None)]
struct Cli {
    /// Data directory shared with the server
    #[arg(long, global = true, default_value = "~/.sparkles")]
    data_dir: String,

    /// Enable verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sections with their stored versions
    Sections,
    /// Print a section as visitors see it
    Get {
        /// Section identifier
        section: String,
    },
    /// Replace a section document with a JSON file
    Put {
        /// Section identifier
        section: String,
        /// JSON document
        file: PathBuf,
        /// Version the document was based on (omit for a first save)
        #[arg(long)]
        base_version: Option<u64>,
    },
    /// Upload a media file into a section and save
    Upload {
        /// Section identifier
        section: String,
        /// Entry position (ignored for the hero image)
        index: usize,
        /// Image or video file
        file: PathBuf,
    },
    /// Delete media no document references
    Gc {
        /// Keep unreferenced objects younger than this
        #[arg(long)]
        grace_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CmsConfig::from_env()?;
    let data_dir = PathBuf::from(shellexpand::tilde(&cli.data_dir).to_string());
    let client = open_client(&config, &data_dir).await?;
    tracing::debug!(data_dir = %data_dir.display(), bucket = %config.bucket, "Opened stores");

    match cli.command {
        Commands::Sections => {
            for kind in SectionKind::all() {
                match client.store().get(kind.as_str()).await? {
                    Some(doc) => println!(
                        "{:<20} v{}  updated {}",
                        kind.as_str(),
                        doc.version,
                        doc.updated_at
                    ),
                    None => println!("{:<20} (defaults)", kind.as_str()),
                }
            }
        }
        Commands::Get { section } => {
            let kind = SectionKind::parse(&section)?;
            let (content, source) = render_json(&client, kind).await;
            tracing::info!(section = %kind, ?source, "Rendered section");
            eprintln!("source: {}", serde_json::to_string(&source)?);
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
        Commands::Put {
            section,
            file,
            base_version,
        } => {
            let kind = SectionKind::parse(&section)?;
            let raw = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let content: serde_json::Value = serde_json::from_slice(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;
            let outcome = save_json(
                &client,
                kind,
                &content,
                base_version,
                Some(config.media_gc_grace_ms),
            )
            .await?;
            tracing::info!(section = %kind, version = outcome.version(), "Section saved via CLI");
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Commands::Upload {
            section,
            index,
            file,
        } => {
            let kind = SectionKind::parse(&section)?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let media_file = MediaFile::new(file_name, bytes);

            let (tx, mut rx) = watch::channel(UploadProgress::default());
            let reporter = tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let progress = *rx.borrow();
                    eprint!("\ruploading {:>3}%", progress.percent());
                }
                eprintln!();
            });

            let result = upload_json(
                &client,
                kind,
                media_target(kind, index),
                &media_file,
                Some(&tx),
            )
            .await;
            drop(tx);
            reporter.await?;

            let (media, outcome) = result?;
            tracing::info!(
                section = %kind,
                url = %media.url,
                version = outcome.version(),
                "Media uploaded via CLI"
            );
            println!("{}", media.url);
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Commands::Gc { grace_secs } => {
            let grace_ms = grace_secs
                .map_or(config.media_gc_grace_ms, |s| s.saturating_mul(TIME_MS_PER_SEC));
            tracing::info!(grace_ms, "Sweeping media");
            let report = client.collector().sweep(grace_ms).await?;
            for name in &report.deleted {
                println!("deleted {name}");
            }
            eprintln!(
                "{} deleted, {} referenced, {} within grace",
                report.deleted.len(),
                report.referenced,
                report.within_grace
            );
        }
    }

    Ok(())
}

async fn open_client(config: &CmsConfig, data_dir: &Path) -> anyhow::Result<ContentClient> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn ContentStore> = Arc::new(FileContentStore::open(data_dir, clock.clone()).await?);
    let media = FsMediaStore::open(
        &data_dir.join(MEDIA_DIR_NAME),
        &config.bucket,
        &config.public_base_url,
        clock.clone(),
    )
    .await?;
    Ok(ContentClient::new(store, Arc::new(media), clock)
        .with_transcoder(Arc::new(WebpTranscoder::new(config.webp_quality))))
}

/// The hero image is the section's own field; every other section's media
/// lives on a list entry.
fn media_target(kind: SectionKind, index: usize) -> MediaTarget {
    match kind {
        SectionKind::Hero => MediaTarget::Section,
        _ => MediaTarget::Entry(index),
    }
}
