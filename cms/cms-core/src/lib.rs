//! CMS Core - typed section content with simulation-first storage
//!
//! TigerStyle content layer for the Tiffany Sparkles site.
//!
//! # Philosophy
//!
//! The site repeats one pattern for every editable section: fetch a JSON
//! document, edit it locally, upload media to object storage, write the
//! document back. This crate writes that pattern once:
//! 1. Every section has one schema type, shared by renderer and editor
//! 2. All I/O goes through injected stores ([`ContentClient`])
//! 3. Every store has a simulated twin with seeded fault injection
//! 4. Saves are guarded by document versions
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │   SectionRenderer<S>   │   SectionEditor<S>          │
//! │   (visitor, defaults)  │   (dashboard, save/upload)  │
//! ├──────────────────────────────────────────────────────┤
//! │   SectionSchema: hero, featured_products, ...        │
//! ├──────────────────────────────────────────────────────┤
//! │   ContentClient                                      │
//! │   ContentStore (docs)  │ MediaStore (objects)        │
//! │   MediaPipeline        │ MediaCollector              │
//! ├──────────────────────────────────────────────────────┤
//! │   DST: SimClock, FaultInjector                       │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use cms_core::dst::SimClock;
//! use cms_core::media::SimMediaStore;
//! use cms_core::section::HeroContent;
//! use cms_core::storage::SimContentStore;
//! use cms_core::ContentClient;
//!
//! # tokio_test::block_on(async {
//! let clock = Arc::new(SimClock::new());
//! let client = ContentClient::new(
//!     Arc::new(SimContentStore::new(clock.clone())),
//!     Arc::new(SimMediaStore::new(clock.clone())),
//!     clock,
//! );
//!
//! let rendered = client.renderer::<HeroContent>().load().await;
//! assert_eq!(rendered.content.title, "Tiffany Sparkles");
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod carousel;
pub mod client;
pub mod config;
pub mod constants;
pub mod dst;
pub mod editor;
pub mod media;
pub mod renderer;
pub mod section;
pub mod storage;

// Re-export common types
pub use carousel::Carousel;
pub use client::ContentClient;
pub use config::{CmsConfig, ConfigError};
pub use editor::{
    Direction, EditorError, EditorSnapshot, LoadState, Notice, NoticeLevel, SaveOutcome,
    SectionEditor,
};
pub use media::{MediaError, MediaFile, MediaKind, MediaStore, UploadProgress};
pub use renderer::{FallbackReason, RenderSource, Rendered, SectionRenderer};
pub use section::{ListSection, MediaRef, MediaTarget, SchemaError, SectionKind, SectionSchema};
pub use storage::{ContentStore, StoreError, StoredDocument};
