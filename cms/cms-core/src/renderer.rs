//! SectionRenderer - the visitor-facing read
//!
//! One read per load, no retry. Whatever goes wrong (read error, no row,
//! malformed or empty document) the visitor gets the section's defaults and
//! the reason is logged, never returned.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ContentClient;
use crate::for_section;
use crate::section::{decode, encode, SectionKind, SectionSchema};
use crate::storage::ContentStore;

/// Why a renderer used its defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The read failed
    ReadFailed,
    /// No document is stored
    Missing,
    /// The stored document does not fit the schema
    Malformed,
    /// The stored document has nothing to show
    Empty,
}

/// Where rendered content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum RenderSource {
    /// The stored document at this version
    Stored {
        /// Stored version
        version: u64,
    },
    /// Built-in defaults
    Default {
        /// Why
        reason: FallbackReason,
    },
}

/// Content ready for the visitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered<S> {
    /// Visitor view of the document
    pub content: S,
    /// Stored or defaults
    pub source: RenderSource,
}

impl<S> Rendered<S> {
    /// Whether defaults were used.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, RenderSource::Default { .. })
    }
}

/// Reads and decodes one section for visitors.
#[derive(Debug, Clone)]
pub struct SectionRenderer<S> {
    client: ContentClient,
    _schema: PhantomData<fn() -> S>,
}

impl<S: SectionSchema> SectionRenderer<S> {
    /// Create a renderer.
    #[must_use]
    pub fn new(client: ContentClient) -> Self {
        Self {
            client,
            _schema: PhantomData,
        }
    }

    /// Read the section once. Never fails.
    pub async fn load(&self) -> Rendered<S> {
        let section = S::SECTION;
        let stored = match self.client.store().get(section).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::debug!(section, "No stored document, rendering defaults");
                return fallback(FallbackReason::Missing);
            }
            Err(e) => {
                tracing::warn!(section, error = %e, "Read failed, rendering defaults");
                return fallback(FallbackReason::ReadFailed);
            }
        };

        let content = match decode::<S>(&stored.content) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(section, version = stored.version, error = %e, "Malformed document, rendering defaults");
                return fallback(FallbackReason::Malformed);
            }
        };
        if !content.is_renderable() {
            tracing::warn!(section, version = stored.version, "Nothing to show, rendering defaults");
            return fallback(FallbackReason::Empty);
        }

        Rendered {
            content: content.for_visitors(),
            source: RenderSource::Stored {
                version: stored.version,
            },
        }
    }
}

fn fallback<S: SectionSchema>(reason: FallbackReason) -> Rendered<S> {
    Rendered {
        content: S::default().for_visitors(),
        source: RenderSource::Default { reason },
    }
}

/// Render a section chosen at runtime, as JSON.
pub async fn render_json(client: &ContentClient, kind: SectionKind) -> (Value, RenderSource) {
    for_section!(kind, S => {
        let rendered = client.renderer::<S>().load().await;
        // Section types serialize infallibly; an empty object is the fallback
        // if one ever does not.
        let value = encode(&rendered.content).unwrap_or_else(|_| Value::Object(Default::default()));
        (value, rendered.source)
    })
}

// =============================================================================
// Tests
// =============================================================================
