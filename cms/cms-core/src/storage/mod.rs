//! Storage - Content Store Trait and Implementations
//!
//! TigerStyle: Abstract storage with simulation-first testing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ContentStore Trait                        │
//! └─────────────────────────────────────────────────────────────┘
//!        ↑                     ↑                      ↑
//! ┌──────┴─────────┐ ┌─────────┴────────┐ ┌───────────┴──────────┐
//! │SimContentStore │ │ FileContentStore │ │ PostgresContentStore │
//! │   (testing)    │ │  (single node)   │ │     (production)     │
//! └────────────────┘ └──────────────────┘ └──────────────────────┘
//! ```

mod backend;
mod document;
mod error;
mod file;
mod sim;

#[cfg(feature = "postgres")]
mod postgres;

pub use backend::ContentStore;
pub use document::{check_section_id, StoredDocument, StoredDocumentBuilder};
pub use error::{StoreError, StoreResult};
pub use file::{FileContentStore, CONTENT_FILE_NAME, CONTENT_LOCK_FILE_NAME};
pub use sim::SimContentStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresContentStore;
