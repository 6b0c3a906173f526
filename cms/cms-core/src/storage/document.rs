//! StoredDocument - the envelope around one section's JSON content
//!
//! TigerStyle: Explicit fields, builder for tests and backends that rebuild
//! rows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{StoreError, StoreResult};
use crate::constants::{DOCUMENT_CONTENT_BYTES_MAX, SECTION_ID_BYTES_MAX};

// =============================================================================
// StoredDocument
// =============================================================================

/// One row of the content table: a section identifier mapped to its JSON
/// document, plus the version used for optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Row identifier (UUID v4)
    pub id: String,
    /// Section identifier (`hero`, `featured_products`, ...)
    pub section: String,
    /// The document itself
    pub content: Value,
    /// 1 on insert, incremented by every update
    pub version: u64,
    /// Insert timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    /// Create a first-version document.
    #[must_use]
    pub fn new(section: &str, content: Value, now: DateTime<Utc>) -> Self {
        Self::builder(section, content)
            .with_created_at(now)
            .with_updated_at(now)
            .build()
    }

    /// Create a builder.
    #[must_use]
    pub fn builder(section: &str, content: Value) -> StoredDocumentBuilder {
        StoredDocumentBuilder::new(section, content)
    }

    /// The next version of this row carrying new content.
    #[must_use]
    pub fn next(&self, content: Value, now: DateTime<Utc>) -> Self {
        let next = Self {
            id: self.id.clone(),
            section: self.section.clone(),
            content,
            version: self.version + 1,
            created_at: self.created_at,
            updated_at: now,
        };

        // Postcondition
        assert!(next.version > self.version, "version must increase");
        next
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`StoredDocument`].
#[derive(Debug)]
pub struct StoredDocumentBuilder {
    section: String,
    content: Value,
    id: Option<String>,
    version: u64,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl StoredDocumentBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(section: &str, content: Value) -> Self {
        Self {
            section: section.to_string(),
            content,
            id: None,
            version: 1,
            created_at: None,
            updated_at: None,
        }
    }

    /// Set custom ID.
    #[must_use]
    pub fn with_id(mut self, id: String) -> Self {
        self.id = Some(id);
        self
    }

    /// Set version.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Set creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Set update timestamp.
    #[must_use]
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Build the document.
    ///
    /// # Panics
    /// Panics if the section identifier is empty or version is zero.
    #[must_use]
    pub fn build(self) -> StoredDocument {
        // Preconditions
        assert!(!self.section.is_empty(), "section cannot be empty");
        assert!(self.version >= 1, "version starts at 1");

        let created_at = self.created_at.unwrap_or_default();
        StoredDocument {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            section: self.section,
            content: self.content,
            version: self.version,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Check a section identifier: non-empty snake_case ASCII within the length
/// limit.
pub fn check_section_id(section: &str) -> StoreResult<()> {
    let well_formed = !section.is_empty()
        && section.len() <= SECTION_ID_BYTES_MAX
        && section
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if well_formed {
        Ok(())
    } else {
        Err(StoreError::internal(format!(
            "invalid section identifier: {section:?}"
        )))
    }
}

/// Reject documents whose serialized form exceeds the size limit.
pub fn check_content_size(section: &str, content: &Value) -> StoreResult<()> {
    let size = serde_json::to_vec(content)
        .map_err(|e| StoreError::internal(format!("failed to serialize content: {e}")))?
        .len();
    if size > DOCUMENT_CONTENT_BYTES_MAX {
        return Err(StoreError::TooLarge {
            section: section.to_string(),
            size,
            max: DOCUMENT_CONTENT_BYTES_MAX,
        });
    }
    Ok(())
}

// =============================================================================
// DocumentTable
// =============================================================================

/// In-memory table shared by the simulated and file-backed stores.
///
/// The insert/update rules (version checks, size limits) live here once so
/// both backends agree on them.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct DocumentTable {
    /// Format version of the persisted table
    pub(crate) format: u32,
    /// Documents keyed by section identifier
    pub(crate) documents: BTreeMap<String, StoredDocument>,
}

impl DocumentTable {
    pub(crate) fn new() -> Self {
        Self {
            format: 1,
            documents: BTreeMap::new(),
        }
    }

    pub(crate) fn get(&self, section: &str) -> Option<StoredDocument> {
        self.documents.get(section).cloned()
    }

    pub(crate) fn insert(
        &mut self,
        section: &str,
        content: &Value,
        now: DateTime<Utc>,
    ) -> StoreResult<StoredDocument> {
        check_section_id(section)?;
        check_content_size(section, content)?;

        if let Some(existing) = self.documents.get(section) {
            return Err(StoreError::Conflict {
                section: section.to_string(),
                expected: None,
                actual: Some(existing.version),
            });
        }

        let document = StoredDocument::new(section, content.clone(), now);
        self.documents.insert(section.to_string(), document.clone());
        Ok(document)
    }

    pub(crate) fn update(
        &mut self,
        section: &str,
        content: &Value,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> StoreResult<StoredDocument> {
        check_content_size(section, content)?;

        let existing = self
            .documents
            .get(section)
            .ok_or_else(|| StoreError::NotFound {
                section: section.to_string(),
            })?;

        if existing.version != expected_version {
            return Err(StoreError::Conflict {
                section: section.to_string(),
                expected: Some(expected_version),
                actual: Some(existing.version),
            });
        }

        let document = existing.next(content.clone(), now);
        self.documents.insert(section.to_string(), document.clone());
        Ok(document)
    }

    pub(crate) fn delete(&mut self, section: &str) -> bool {
        self.documents.remove(section).is_some()
    }

    pub(crate) fn list(&self) -> Vec<StoredDocument> {
        self.documents.values().cloned().collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_new_document_starts_at_version_one() {
        let doc = StoredDocument::new("hero", json!({"title": "x"}), at(1_000));
        assert_eq!(doc.version, 1);
        assert_eq!(doc.created_at, doc.updated_at);
        assert!(!doc.id.is_empty());
    }

    #[test]
    fn test_next_keeps_identity() {
        let doc = StoredDocument::new("hero", json!({}), at(1_000));
        let next = doc.next(json!({"title": "y"}), at(2_000));
        assert_eq!(next.id, doc.id);
        assert_eq!(next.version, 2);
        assert_eq!(next.created_at, at(1_000));
        assert_eq!(next.updated_at, at(2_000));
    }

    #[test]
    fn test_builder() {
        let doc = StoredDocument::builder("faq", json!([]))
            .with_id("row-1".to_string())
            .with_version(7)
            .build();
        assert_eq!(doc.id, "row-1");
        assert_eq!(doc.version, 7);
    }

    #[test]
    fn test_section_id_rules() {
        assert!(check_section_id("featured_products").is_ok());
        assert!(check_section_id("").is_err());
        assert!(check_section_id("Hero").is_err());
        assert!(check_section_id("../etc").is_err());
    }

    #[test]
    fn test_table_insert_then_update() {
        let mut table = DocumentTable::new();
        let inserted = table.insert("hero", &json!({"a": 1}), at(1)).unwrap();
        let updated = table
            .update("hero", &json!({"a": 2}), inserted.version, at(2))
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(table.get("hero").unwrap().content, json!({"a": 2}));
    }

    #[test]
    fn test_table_insert_twice_conflicts() {
        let mut table = DocumentTable::new();
        table.insert("hero", &json!({}), at(1)).unwrap();
        let err = table.insert("hero", &json!({}), at(2)).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_table_stale_update_conflicts() {
        let mut table = DocumentTable::new();
        table.insert("hero", &json!({}), at(1)).unwrap();
        table.update("hero", &json!({"v": 2}), 1, at(2)).unwrap();

        let err = table.update("hero", &json!({"v": 3}), 1, at(3)).unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                section: "hero".to_string(),
                expected: Some(1),
                actual: Some(2),
            }
        );
    }

    #[test]
    fn test_table_update_missing() {
        let mut table = DocumentTable::new();
        let err = table.update("hero", &json!({}), 1, at(1)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_table_rejects_oversized_document() {
        let mut table = DocumentTable::new();
        let big = json!({ "blob": "x".repeat(DOCUMENT_CONTENT_BYTES_MAX) });
        let err = table.insert("hero", &big, at(1)).unwrap_err();
        assert!(matches!(err, StoreError::TooLarge { .. }));
    }
}
