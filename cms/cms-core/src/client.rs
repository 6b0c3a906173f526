//! ContentClient - the injected handle to both stores
//!
//! Built once by the application root and cloned into every renderer, editor,
//! pipeline and collector. Cloning is cheap (three `Arc`s).

use std::sync::Arc;

use crate::dst::Clock;
use crate::editor::SectionEditor;
use crate::media::{ImageTranscoder, MediaCollector, MediaPipeline, MediaStore, WebpTranscoder};
use crate::renderer::SectionRenderer;
use crate::section::SectionSchema;
use crate::storage::ContentStore;

/// Content and media stores plus the clock every timestamp comes from.
#[derive(Debug, Clone)]
pub struct ContentClient {
    store: Arc<dyn ContentStore>,
    media: Arc<dyn MediaStore>,
    transcoder: Arc<dyn ImageTranscoder>,
    clock: Arc<dyn Clock>,
}

impl ContentClient {
    /// Create a client with the default WebP transcoder.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContentStore>,
        media: Arc<dyn MediaStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            media,
            transcoder: Arc::new(WebpTranscoder::default()),
            clock,
        }
    }

    /// Replace the transcoder.
    #[must_use]
    pub fn with_transcoder(mut self, transcoder: Arc<dyn ImageTranscoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Content document store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Object store.
    #[must_use]
    pub fn media(&self) -> &Arc<dyn MediaStore> {
        &self.media
    }

    /// Clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Upload pipeline over this client's object store.
    #[must_use]
    pub fn pipeline(&self) -> MediaPipeline {
        MediaPipeline::with_transcoder(
            self.media.clone(),
            self.transcoder.clone(),
            self.clock.clone(),
        )
    }

    /// Collector sweeping this client's bucket.
    #[must_use]
    pub fn collector(&self) -> MediaCollector {
        MediaCollector::new(self.store.clone(), self.media.clone(), self.clock.clone())
    }

    /// Read-only view of one section.
    #[must_use]
    pub fn renderer<S: SectionSchema>(&self) -> SectionRenderer<S> {
        SectionRenderer::new(self.clone())
    }

    /// Editor for one section, not yet loaded.
    #[must_use]
    pub fn editor<S: SectionSchema>(&self) -> SectionEditor<S> {
        SectionEditor::new(self.clone())
    }
}
