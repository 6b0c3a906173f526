//! MediaCollector - deletes objects no document references
//!
//! TigerStyle: a sweep only deletes when the full reference set is known. If
//! the content store cannot be listed the sweep aborts without deleting.
//! Objects younger than the grace period survive, so uploads that have not
//! been saved into a document yet are not collected.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::{MediaResult, MediaStore};
use crate::dst::Clock;
use crate::for_section;
use crate::section::{decode, SectionKind, SectionSchema};
use crate::storage::{ContentStore, StoredDocument};

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Objects deleted
    pub deleted: Vec<String>,
    /// Objects still referenced by a document
    pub referenced: usize,
    /// Unreferenced objects kept because they are within the grace period
    pub within_grace: usize,
}

/// Sweeps a bucket against the content store.
#[derive(Debug, Clone)]
pub struct MediaCollector {
    content: Arc<dyn ContentStore>,
    media: Arc<dyn MediaStore>,
    clock: Arc<dyn Clock>,
}

impl MediaCollector {
    /// Create a collector.
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentStore>,
        media: Arc<dyn MediaStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            content,
            media,
            clock,
        }
    }

    /// Delete every unreferenced object older than `grace_ms`.
    ///
    /// # Errors
    /// Returns error if documents or objects cannot be listed, or a delete
    /// fails. Deletes made before the failure stay deleted.
    pub async fn sweep(&self, grace_ms: u64) -> MediaResult<SweepReport> {
        let documents = self.content.list().await?;
        let referenced: HashSet<String> = documents
            .iter()
            .flat_map(referenced_urls)
            .filter_map(|url| self.media.object_name_for_url(&url).map(str::to_string))
            .collect();

        let now_ms = self.clock.now_ms();
        let mut report = SweepReport::default();
        for object in self.media.list().await? {
            if referenced.contains(&object.name) {
                report.referenced += 1;
                continue;
            }
            let created_ms = u64::try_from(object.created_at.timestamp_millis()).unwrap_or(0);
            if now_ms.saturating_sub(created_ms) < grace_ms {
                report.within_grace += 1;
                continue;
            }
            if self.media.delete(&object.name).await? {
                tracing::info!(object = %object.name, "Collected unreferenced media");
                report.deleted.push(object.name);
            }
        }

        tracing::debug!(
            deleted = report.deleted.len(),
            referenced = report.referenced,
            within_grace = report.within_grace,
            "Media sweep finished"
        );
        Ok(report)
    }
}

/// URLs a stored document may reference. Documents of known sections that
/// decode use their schema; anything else contributes every string it holds,
/// so a malformed document never loses its media.
fn referenced_urls(document: &StoredDocument) -> Vec<String> {
    let typed = SectionKind::from_id(&document.section).and_then(|kind| {
        for_section!(kind, S => decode::<S>(&document.content)
            .ok()
            .map(|doc| doc.media_urls().into_iter().map(str::to_string).collect::<Vec<_>>()))
    });
    typed.unwrap_or_else(|| {
        let mut out = Vec::new();
        collect_strings(&document.content, &mut out);
        out
    })
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

// =============================================================================
// Tests
// =============================================================================
