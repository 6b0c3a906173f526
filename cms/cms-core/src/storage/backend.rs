//! ContentStore - the keyed document store trait

use async_trait::async_trait;
use serde_json::Value;

use super::document::StoredDocument;
use super::error::StoreResult;

/// Keyed document storage: one JSON document per section identifier.
///
/// Writes are versioned. `insert` only succeeds when no document exists and
/// `update` only succeeds when the stored version equals `expected_version`;
/// both fail with [`StoreError::Conflict`](super::StoreError::Conflict)
/// otherwise.
#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug {
    /// Read the document for a section, `None` when nothing is stored.
    async fn get(&self, section: &str) -> StoreResult<Option<StoredDocument>>;

    /// Store the first version of a section's document.
    async fn insert(&self, section: &str, content: &Value) -> StoreResult<StoredDocument>;

    /// Replace a section's document if the stored version matches.
    async fn update(
        &self,
        section: &str,
        content: &Value,
        expected_version: u64,
    ) -> StoreResult<StoredDocument>;

    /// Remove a section's document. Returns whether one existed.
    async fn delete(&self, section: &str) -> StoreResult<bool>;

    /// Every stored document, ordered by section identifier.
    async fn list(&self) -> StoreResult<Vec<StoredDocument>>;
}
