//! FileContentStore - documents persisted as one JSON file
//!
//! The file is the only source of truth: every operation takes an OS lock on
//! a sibling lock file and re-reads the table, so the server and the CLI can
//! share one data directory. Mutations write a temporary sibling first, then
//! rename it over the previous file, both under the exclusive lock.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::backend::ContentStore;
use super::document::{DocumentTable, StoredDocument};
use super::error::{StoreError, StoreResult};
use crate::dst::Clock;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Table file name inside the data directory
pub const CONTENT_FILE_NAME: &str = "content_sections.json";

/// Lock file guarding the table file
pub const CONTENT_LOCK_FILE_NAME: &str = "content_sections.lock";

// =============================================================================
// FileContentStore
// =============================================================================

/// [`ContentStore`] backed by a JSON file in the data directory.
#[derive(Debug)]
pub struct FileContentStore {
    path: PathBuf,
    lock_path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileContentStore {
    /// Open (or create) the store in `data_dir`.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or an existing table
    /// file cannot be parsed.
    pub async fn open(data_dir: &Path, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| StoreError::connection(format!("failed to create data dir: {e}")))?;

        let store = Self {
            path: data_dir.join(CONTENT_FILE_NAME),
            lock_path: data_dir.join(CONTENT_LOCK_FILE_NAME),
            clock,
        };
        let documents = store.read(|table| table.documents.len()).await?;

        tracing::debug!(path = %store.path.display(), documents, "Opened content table");
        Ok(store)
    }

    /// Location of the table file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` against the table as it is on disk, under a shared lock.
    async fn read<T: Send + 'static>(
        &self,
        op: impl FnOnce(&DocumentTable) -> T + Send + 'static,
    ) -> StoreResult<T> {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || {
            let lock = fd_lock::RwLock::new(open_lock_file(&lock_path)?);
            let _guard = lock
                .read()
                .map_err(|e| StoreError::read(format!("failed to lock table: {e}")))?;
            Ok(op(&load_table(&path)?))
        })
        .await
        .map_err(|e| StoreError::internal(format!("table worker failed: {e}")))?
    }

    /// Re-read the table under an exclusive lock, apply `op` and persist the
    /// result. Nothing is written when `op` fails.
    async fn mutate<T: Send + 'static>(
        &self,
        op: impl FnOnce(&mut DocumentTable) -> StoreResult<T> + Send + 'static,
    ) -> StoreResult<T> {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut lock = fd_lock::RwLock::new(open_lock_file(&lock_path)?);
            let _guard = lock
                .write()
                .map_err(|e| StoreError::write(format!("failed to lock table: {e}")))?;
            let mut table = load_table(&path)?;
            let result = op(&mut table)?;
            save_table(&path, &table)?;
            Ok(result)
        })
        .await
        .map_err(|e| StoreError::internal(format!("table worker failed: {e}")))?
    }
}

fn open_lock_file(lock_path: &Path) -> StoreResult<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .map_err(|e| StoreError::connection(format!("failed to open {}: {e}", lock_path.display())))
}

fn load_table(path: &Path) -> StoreResult<DocumentTable> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::internal(format!("invalid content table: {e}"))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DocumentTable::new()),
        Err(e) => Err(StoreError::read(format!("failed to read {}: {e}", path.display()))),
    }
}

fn save_table(path: &Path, table: &DocumentTable) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(table)
        .map_err(|e| StoreError::internal(format!("failed to serialize table: {e}")))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &bytes)
        .map_err(|e| StoreError::write(format!("failed to write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::write(format!("failed to replace table: {e}")))
}

#[async_trait]
impl ContentStore for FileContentStore {
    async fn get(&self, section: &str) -> StoreResult<Option<StoredDocument>> {
        let section = section.to_string();
        self.read(move |table| table.get(&section)).await
    }

    async fn insert(&self, section: &str, content: &Value) -> StoreResult<StoredDocument> {
        let now = self.clock.now();
        let (section, content) = (section.to_string(), content.clone());
        self.mutate(move |table| table.insert(&section, &content, now)).await
    }

    async fn update(
        &self,
        section: &str,
        content: &Value,
        expected_version: u64,
    ) -> StoreResult<StoredDocument> {
        let now = self.clock.now();
        let (section, content) = (section.to_string(), content.clone());
        self.mutate(move |table| table.update(&section, &content, expected_version, now))
            .await
    }

    async fn delete(&self, section: &str) -> StoreResult<bool> {
        let section = section.to_string();
        self.mutate(move |table| Ok(table.delete(&section))).await
    }

    async fn list(&self) -> StoreResult<Vec<StoredDocument>> {
        self.read(DocumentTable::list).await
    }
}

// =============================================================================
// Tests
// =============================================================================
