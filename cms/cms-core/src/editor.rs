//! SectionEditor - the dashboard's read-write view of one section
//!
//! TigerStyle: all edits are local and synchronous; only `load`, `save` and
//! `upload_media` touch the stores. A save replaces the whole stored document
//! in one write, guarded by the version the editor loaded.
//!
//! Failures never discard local edits. They are returned to the caller and
//! also recorded as [`Notice`]s for the operator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::client::ContentClient;
use crate::for_section;
use crate::media::{MediaError, MediaFile, UploadProgress};
use crate::section::{
    decode, encode, set_field, ListSection, MediaRef, MediaTarget, SchemaError, SectionKind,
    SectionSchema,
};
use crate::storage::{ContentStore, StoreError};

// =============================================================================
// Types
// =============================================================================

/// Errors surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    /// Document or edit breaks the section schema
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// List position past the end
    #[error("entry index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested position
        index: usize,
        /// Current list length
        len: usize,
    },

    /// Content store failed or the stored version moved
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Upload pipeline failed
    #[error(transparent)]
    Media(#[from] MediaError),
}

impl EditorError {
    /// Whether the save lost a race with another editor.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }
}

/// What `load` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum LoadState {
    /// Not loaded yet
    Unloaded,
    /// Editing the stored document
    Stored {
        /// Version loaded
        version: u64,
    },
    /// No stored document; editing defaults, first save inserts
    Missing,
    /// Stored document did not fit the schema; editing defaults, saving
    /// overwrites it
    Malformed {
        /// Version of the rejected document
        version: u64,
    },
    /// Read failed; editing defaults
    ReadFailed,
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Something worked
    Info,
    /// Something was recovered from
    Warning,
    /// Something failed
    Error,
}

/// A message for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Human-readable text
    pub message: String,
}

/// Which neighbor an entry swaps with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards index 0
    Up,
    /// Towards the end
    Down,
}

/// Which write a save performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SaveOutcome {
    /// First document for the section
    Inserted {
        /// New version
        version: u64,
    },
    /// Replaced an existing document
    Updated {
        /// New version
        version: u64,
    },
}

impl SaveOutcome {
    /// Stored version after the save.
    #[must_use]
    pub fn version(&self) -> u64 {
        match self {
            Self::Inserted { version } | Self::Updated { version } => *version,
        }
    }
}

// =============================================================================
// SectionEditor
// =============================================================================

/// Local editing state for one section.
#[derive(Debug, Clone)]
pub struct SectionEditor<S> {
    client: ContentClient,
    document: S,
    base_version: Option<u64>,
    state: LoadState,
    notices: Vec<Notice>,
    sweep_grace_ms: Option<u64>,
}

impl<S: SectionSchema> SectionEditor<S> {
    /// Editor holding defaults; call [`SectionEditor::load`] next.
    #[must_use]
    pub fn new(client: ContentClient) -> Self {
        Self {
            client,
            document: S::default(),
            base_version: None,
            state: LoadState::Unloaded,
            notices: Vec::new(),
            sweep_grace_ms: None,
        }
    }

    /// Editor over a document the caller already has, based on
    /// `base_version` (`None` when no row is expected to exist).
    #[must_use]
    pub fn with_document(client: ContentClient, document: S, base_version: Option<u64>) -> Self {
        let state = base_version.map_or(LoadState::Missing, |version| LoadState::Stored { version });
        Self {
            document,
            base_version,
            state,
            ..Self::new(client)
        }
    }

    /// Sweep unreferenced media older than `grace_ms` after every successful
    /// save.
    #[must_use]
    pub fn with_media_sweep(mut self, grace_ms: u64) -> Self {
        self.sweep_grace_ms = Some(grace_ms);
        self
    }

    /// Read the stored document, falling back to defaults.
    pub async fn load(&mut self) -> &S {
        let section = S::SECTION;
        self.document = S::default();
        self.base_version = None;

        self.state = match self.client.store().get(section).await {
            Ok(Some(stored)) => match decode::<S>(&stored.content) {
                Ok(document) => {
                    self.document = document;
                    self.base_version = Some(stored.version);
                    LoadState::Stored {
                        version: stored.version,
                    }
                }
                Err(e) => {
                    tracing::warn!(section, version = stored.version, error = %e, "Stored document rejected");
                    self.notify(
                        NoticeLevel::Warning,
                        format!("Stored content did not match the {section} schema and was replaced by defaults: {e}"),
                    );
                    self.base_version = Some(stored.version);
                    LoadState::Malformed {
                        version: stored.version,
                    }
                }
            },
            Ok(None) => LoadState::Missing,
            Err(e) => {
                tracing::warn!(section, error = %e, "Failed to load section");
                self.notify(NoticeLevel::Warning, format!("Could not load {section}: {e}"));
                LoadState::ReadFailed
            }
        };
        &self.document
    }

    /// Current local document.
    #[must_use]
    pub fn document(&self) -> &S {
        &self.document
    }

    /// Version the next save expects to replace.
    #[must_use]
    pub fn base_version(&self) -> Option<u64> {
        self.base_version
    }

    /// What the last load found.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Notices recorded so far.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Drain recorded notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Apply an arbitrary local change.
    pub fn edit(&mut self, f: impl FnOnce(&mut S)) {
        f(&mut self.document);
    }

    /// Replace one scalar field by JSON pointer.
    ///
    /// # Errors
    /// Returns error if the field does not exist or the value breaks the
    /// schema; the document is unchanged.
    pub fn set_field(&mut self, pointer: &str, value: Value) -> Result<(), EditorError> {
        set_field(&mut self.document, pointer, value)?;
        Ok(())
    }

    /// Write a media reference into the document.
    ///
    /// # Errors
    /// Returns error if the target has no media field or the kind does not
    /// fit it; the document is unchanged.
    pub fn set_media(&mut self, target: MediaTarget, media: &MediaRef) -> Result<(), EditorError> {
        let mut next = self.document.clone();
        next.apply_media(target, media)?;
        self.document = next;
        Ok(())
    }

    /// Run the upload pipeline for `file` and write the resulting URL into
    /// `target`. On any failure the field keeps its previous value.
    ///
    /// # Errors
    /// Returns the schema error for a bad target (checked before uploading)
    /// or the pipeline error.
    pub async fn upload_media(
        &mut self,
        target: MediaTarget,
        file: &MediaFile,
        progress: Option<&watch::Sender<UploadProgress>>,
    ) -> Result<MediaRef, EditorError> {
        let section = S::SECTION;
        let probe = MediaRef {
            url: String::new(),
            kind: file.kind(),
        };
        self.document.clone().apply_media(target, &probe)?;

        let media = match self
            .client
            .pipeline()
            .upload(S::MEDIA_PREFIX, target.index(), file, progress)
            .await
        {
            Ok(media) => media,
            Err(e) => {
                tracing::warn!(section, file = %file.file_name, error = %e, "Upload failed");
                self.notify(NoticeLevel::Error, format!("Upload of {} failed: {e}", file.file_name));
                return Err(e.into());
            }
        };

        self.set_media(target, &media)?;
        self.notify(NoticeLevel::Info, format!("Uploaded {}", file.file_name));
        Ok(media)
    }

    /// Replace the stored document with the local one.
    ///
    /// Inserts when the editor expects no row, otherwise updates the version
    /// it loaded. Local edits are kept whatever happens.
    ///
    /// # Errors
    /// Returns a schema error if the document is invalid, a conflict if the
    /// stored version moved, or the store error.
    pub async fn save(&mut self) -> Result<SaveOutcome, EditorError> {
        let section = S::SECTION;
        let result = self.write().await;

        match &result {
            Ok(outcome) => {
                tracing::info!(section, version = outcome.version(), ?outcome, "Saved section");
                self.notify(NoticeLevel::Info, format!("{section} saved"));
                if let Some(grace_ms) = self.sweep_grace_ms {
                    self.sweep(grace_ms).await;
                }
            }
            Err(e) => {
                tracing::warn!(section, base_version = ?self.base_version, error = %e, "Save failed");
                let message = if e.is_conflict() {
                    format!("{section} was changed elsewhere; reload before saving: {e}")
                } else {
                    format!("Saving {section} failed: {e}")
                };
                self.notify(NoticeLevel::Error, message);
            }
        }
        result
    }

    async fn write(&mut self) -> Result<SaveOutcome, EditorError> {
        let section = S::SECTION;
        self.document.validate()?;
        let content = encode(&self.document)?;

        let outcome = match self.base_version {
            None => {
                let stored = self.client.store().insert(section, &content).await?;
                SaveOutcome::Inserted {
                    version: stored.version,
                }
            }
            Some(expected) => {
                let stored = self.client.store().update(section, &content, expected).await?;
                SaveOutcome::Updated {
                    version: stored.version,
                }
            }
        };

        // Postcondition
        assert!(
            self.base_version.map_or(true, |v| outcome.version() > v),
            "saved version must advance"
        );
        self.base_version = Some(outcome.version());
        self.state = LoadState::Stored {
            version: outcome.version(),
        };
        Ok(outcome)
    }

    async fn sweep(&mut self, grace_ms: u64) {
        match self.client.collector().sweep(grace_ms).await {
            Ok(report) if !report.deleted.is_empty() => self.notify(
                NoticeLevel::Info,
                format!("Removed {} unused media object(s)", report.deleted.len()),
            ),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Media sweep failed");
                self.notify(NoticeLevel::Warning, format!("Media cleanup failed: {e}"));
            }
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: String) {
        self.notices.push(Notice { level, message });
    }
}

impl<S: ListSection> SectionEditor<S> {
    /// Append the section's blank entry. Returns its index.
    pub fn add_entry(&mut self) -> usize {
        let entries = self.document.entries_mut();
        entries.push(S::blank_entry());
        entries.len() - 1
    }

    /// Remove and return the entry at `index`.
    ///
    /// # Errors
    /// Returns [`EditorError::IndexOutOfRange`] if `index >= len`.
    pub fn remove_entry(&mut self, index: usize) -> Result<S::Entry, EditorError> {
        let entries = self.document.entries_mut();
        let len = entries.len();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }
        let removed = entries.remove(index);

        // Postcondition
        assert_eq!(entries.len(), len - 1, "remove must shorten by one");
        Ok(removed)
    }

    /// Swap the entry at `index` with its neighbor. Moving past either end
    /// (or from a position that does not exist) does nothing and returns
    /// `false`.
    pub fn move_entry(&mut self, index: usize, direction: Direction) -> bool {
        let entries = self.document.entries_mut();
        let neighbor = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        };
        match neighbor {
            Some(other) if index < entries.len() && other < entries.len() => {
                entries.swap(index, other);
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// Runtime-kind helpers
// =============================================================================

/// Editor state for a section chosen at runtime, as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSnapshot {
    /// Section identifier
    pub section: String,
    /// Document being edited
    pub content: Value,
    /// Version a save will expect
    pub version: Option<u64>,
    /// What the load found
    pub load: LoadState,
    /// Operator notices
    pub notices: Vec<Notice>,
}

/// Load a section chosen at runtime.
///
/// # Errors
/// Returns a schema error only if the section type cannot be serialized.
pub async fn load_json(client: &ContentClient, kind: SectionKind) -> Result<EditorSnapshot, EditorError> {
    for_section!(kind, S => {
        let mut editor = client.editor::<S>();
        editor.load().await;
        Ok(EditorSnapshot {
            section: kind.as_str().to_string(),
            content: encode(editor.document())?,
            version: editor.base_version(),
            load: editor.state(),
            notices: editor.take_notices(),
        })
    })
}

/// Save a JSON document for a section chosen at runtime.
///
/// # Errors
/// Returns a schema error if the document does not fit the section, a
/// conflict if `base_version` is stale, or the store error.
pub async fn save_json(
    client: &ContentClient,
    kind: SectionKind,
    content: &Value,
    base_version: Option<u64>,
    sweep_grace_ms: Option<u64>,
) -> Result<SaveOutcome, EditorError> {
    for_section!(kind, S => {
        let document = decode::<S>(content)?;
        let mut editor = SectionEditor::with_document(client.clone(), document, base_version);
        if let Some(grace_ms) = sweep_grace_ms {
            editor = editor.with_media_sweep(grace_ms);
        }
        editor.save().await
    })
}

/// Load a section chosen at runtime, upload `file` into `target` and save.
///
/// # Errors
/// Returns the upload or save error; nothing is saved if the upload fails.
pub async fn upload_json(
    client: &ContentClient,
    kind: SectionKind,
    target: MediaTarget,
    file: &MediaFile,
    progress: Option<&watch::Sender<UploadProgress>>,
) -> Result<(MediaRef, SaveOutcome), EditorError> {
    for_section!(kind, S => {
        let mut editor = client.editor::<S>();
        editor.load().await;
        if editor.state() == LoadState::ReadFailed {
            return Err(EditorError::Store(StoreError::read(format!(
                "could not load {kind} before uploading"
            ))));
        }
        let media = editor.upload_media(target, file, progress).await?;
        let outcome = editor.save().await?;
        Ok((media, outcome))
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MEDIA_GC_GRACE_MS_DEFAULT;
    use crate::dst::{FaultConfig, FaultInjector, FaultType, SimClock};
    use crate::media::{is_webp, MediaKind, MediaStore, SimMediaStore};
    use crate::section::{HeroContent, MarketingContent, ProductsContent};
    use crate::storage::SimContentStore;
    use bytes::Bytes;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        clock: SimClock,
        store: Arc<SimContentStore>,
        media: Arc<SimMediaStore>,
        client: ContentClient,
    }

    fn fixture_with(store_faults: FaultInjector, media_faults: FaultInjector) -> Fixture {
        let clock = SimClock::at_ms(1_700_000_000_000);
        let store = Arc::new(SimContentStore::with_faults(Arc::new(clock.clone()), store_faults));
        let media = Arc::new(SimMediaStore::with_faults(Arc::new(clock.clone()), media_faults));
        let client = ContentClient::new(store.clone(), media.clone(), Arc::new(clock.clone()));
        Fixture {
            clock,
            store,
            media,
            client,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FaultInjector::none(), FaultInjector::none())
    }

    fn png() -> Bytes {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        Bytes::from(buf.into_inner())
    }

    fn names(editor: &SectionEditor<ProductsContent>) -> Vec<String> {
        editor.document().products.iter().map(|p| p.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_first_save_inserts_second_updates() {
        let fx = fixture();
        let mut editor = fx.client.editor::<HeroContent>();
        editor.load().await;
        assert_eq!(editor.state(), LoadState::Missing);

        let first = editor.save().await.unwrap();
        assert_eq!(first, SaveOutcome::Inserted { version: 1 });
        let second = editor.save().await.unwrap();
        assert_eq!(second, SaveOutcome::Updated { version: 2 });
    }

    #[tokio::test]
    async fn test_saving_same_document_twice_is_idempotent() {
        let fx = fixture();
        let mut editor = fx.client.editor::<HeroContent>();
        editor.load().await;
        editor.set_field("/title", json!("Same")).unwrap();

        editor.save().await.unwrap();
        let once = fx.store.get("hero").await.unwrap().unwrap().content;
        editor.save().await.unwrap();
        let twice = fx.store.get("hero").await.unwrap().unwrap().content;
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_move_index_two_up_swaps_one_and_two() {
        let fx = fixture();
        let mut editor = fx.client.editor::<ProductsContent>();
        editor.load().await;
        let before = names(&editor);
        assert_eq!(before.len(), 3);

        assert!(editor.move_entry(2, Direction::Up));
        let after = names(&editor);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1], before[2]);
        assert_eq!(after[2], before[1]);
    }

    #[tokio::test]
    async fn test_move_up_then_down_restores_order() {
        let fx = fixture();
        let mut editor = fx.client.editor::<ProductsContent>();
        editor.load().await;
        let before = names(&editor);

        for i in 1..3 {
            assert!(editor.move_entry(i, Direction::Up));
            assert!(editor.move_entry(i - 1, Direction::Down));
            assert_eq!(names(&editor), before);
        }
        for i in 0..2 {
            assert!(editor.move_entry(i, Direction::Down));
            assert!(editor.move_entry(i + 1, Direction::Up));
            assert_eq!(names(&editor), before);
        }
    }

    #[tokio::test]
    async fn test_move_past_either_end_is_noop() {
        let fx = fixture();
        let mut editor = fx.client.editor::<ProductsContent>();
        editor.load().await;
        let before = names(&editor);
        assert!(!editor.move_entry(0, Direction::Up));
        assert!(!editor.move_entry(2, Direction::Down));
        assert!(!editor.move_entry(7, Direction::Up));
        assert_eq!(names(&editor), before);
    }

    #[tokio::test]
    async fn test_remove_shortens_by_one_preserving_order() {
        let fx = fixture();
        let mut editor = fx.client.editor::<ProductsContent>();
        editor.load().await;
        let before = names(&editor);

        let removed = editor.remove_entry(1).unwrap();
        assert_eq!(removed.name, before[1]);
        assert_eq!(names(&editor), vec![before[0].clone(), before[2].clone()]);

        let err = editor.remove_entry(2).unwrap_err();
        assert_eq!(err, EditorError::IndexOutOfRange { index: 2, len: 2 });
    }

    #[tokio::test]
    async fn test_add_entry_appends_blank() {
        let fx = fixture();
        let mut editor = fx.client.editor::<MarketingContent>();
        editor.load().await;
        let index = editor.add_entry();
        assert_eq!(index, 3);
        assert_eq!(editor.document().items[3], MarketingContent::blank_entry());
    }

    #[tokio::test]
    async fn test_image_upload_writes_served_webp_url() {
        let fx = fixture();
        let mut editor = fx.client.editor::<ProductsContent>();
        editor.load().await;

        let media = editor
            .upload_media(MediaTarget::Entry(1), &MediaFile::new("new.jpg", png()), None)
            .await
            .unwrap();
        assert_eq!(editor.document().products[1].image, media.url);

        let name = fx.media.object_name_for_url(&media.url).unwrap();
        let (object, body) = fx.media.get(name).await.unwrap().unwrap();
        assert_eq!(object.content_type, "image/webp");
        assert!(is_webp(&body));
        assert_eq!(fx.media.public_url(&object.name), media.url);
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_previous_url() {
        let faults = FaultInjector::builder(5)
            .with_fault(FaultConfig::always(FaultType::MediaUploadFail))
            .build();
        let fx = fixture_with(FaultInjector::none(), faults);
        let mut editor = fx.client.editor::<HeroContent>();
        editor.load().await;
        let before = editor.document().image_url.clone();

        let result = editor
            .upload_media(MediaTarget::Section, &MediaFile::new("hero.png", png()), None)
            .await;
        assert!(matches!(result, Err(EditorError::Media(MediaError::Upload(_)))));
        assert_eq!(editor.document().image_url, before);
        assert_eq!(editor.notices().last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_bad_target_rejected_before_upload() {
        let fx = fixture();
        let mut editor = fx.client.editor::<ProductsContent>();
        editor.load().await;
        let result = editor
            .upload_media(MediaTarget::Entry(9), &MediaFile::new("x.png", png()), None)
            .await;
        assert_err!(result);
        assert!(fx.media.is_empty().await);
    }

    #[tokio::test]
    async fn test_marketing_video_upload_records_kind() {
        let fx = fixture();
        let mut editor = fx.client.editor::<MarketingContent>();
        editor.load().await;
        let media = editor
            .upload_media(MediaTarget::Entry(0), &MediaFile::new("promo.mp4", &b"mp4"[..]), None)
            .await
            .unwrap();
        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(editor.document().items[0].kind, MediaKind::Video);
        assert_eq!(editor.document().items[0].src, media.url);
    }

    #[tokio::test]
    async fn test_stale_editor_conflicts_and_keeps_edits() {
        let fx = fixture();
        let mut first = fx.client.editor::<HeroContent>();
        first.load().await;
        first.save().await.unwrap();

        let mut a = fx.client.editor::<HeroContent>();
        let mut b = fx.client.editor::<HeroContent>();
        a.load().await;
        b.load().await;

        a.set_field("/title", json!("A")).unwrap();
        assert_ok!(a.save().await);

        b.set_field("/title", json!("B")).unwrap();
        let err = b.save().await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(b.document().title, "B");

        b.load().await;
        assert_eq!(b.document().title, "A");
    }

    #[tokio::test]
    async fn test_save_failure_keeps_edits_and_notifies() {
        let faults = FaultInjector::builder(9)
            .with_fault(FaultConfig::always(FaultType::StoreWriteFail))
            .build();
        let fx = fixture_with(faults, FaultInjector::none());
        let mut editor = fx.client.editor::<HeroContent>();
        editor.load().await;
        editor.set_field("/subtitle", json!("Kept")).unwrap();

        let err = editor.save().await.unwrap_err();
        assert!(matches!(err, EditorError::Store(StoreError::Write(_))));
        assert_eq!(editor.document().subtitle, "Kept");
        assert_eq!(editor.base_version(), None);
    }

    #[tokio::test]
    async fn test_malformed_row_loads_defaults_and_save_overwrites() {
        let fx = fixture();
        fx.store.insert("hero", &json!({"title": ["nope"]})).await.unwrap();

        let mut editor = fx.client.editor::<HeroContent>();
        editor.load().await;
        assert_eq!(editor.state(), LoadState::Malformed { version: 1 });
        assert_eq!(editor.document(), &HeroContent::default());
        assert_eq!(editor.notices()[0].level, NoticeLevel::Warning);

        assert_eq!(editor.save().await.unwrap(), SaveOutcome::Updated { version: 2 });
    }

    #[tokio::test]
    async fn test_invalid_document_not_saved() {
        let fx = fixture();
        let mut editor = fx.client.editor::<ProductsContent>();
        editor.load().await;
        editor.edit(|doc| doc.products[0].rating = 9.0);

        let err = editor.save().await.unwrap_err();
        assert!(matches!(err, EditorError::Schema(SchemaError::Invalid { .. })));
        assert!(fx.store.get("featured_products").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_sweeps_replaced_media() {
        let fx = fixture();
        let mut editor = fx
            .client
            .editor::<HeroContent>()
            .with_media_sweep(MEDIA_GC_GRACE_MS_DEFAULT);
        editor.load().await;

        editor
            .upload_media(MediaTarget::Section, &MediaFile::new("old.png", png()), None)
            .await
            .unwrap();
        editor.save().await.unwrap();

        fx.clock.advance_ms(MEDIA_GC_GRACE_MS_DEFAULT);
        let replacement = editor
            .upload_media(MediaTarget::Section, &MediaFile::new("new.png", png()), None)
            .await
            .unwrap();
        editor.save().await.unwrap();

        let objects = fx.media.list().await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(fx.media.public_url(&objects[0].name), replacement.url);
    }

    #[tokio::test]
    async fn test_runtime_helpers_round_trip() {
        let fx = fixture();
        let snapshot = load_json(&fx.client, SectionKind::Faq).await.unwrap();
        assert_eq!(snapshot.load, LoadState::Missing);
        assert_eq!(snapshot.version, None);

        let outcome = save_json(&fx.client, SectionKind::Faq, &snapshot.content, None, None)
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Inserted { version: 1 });

        let stale = save_json(&fx.client, SectionKind::Faq, &snapshot.content, None, None).await;
        assert!(stale.unwrap_err().is_conflict());

        let bad = save_json(&fx.client, SectionKind::Faq, &json!({"title": 1}), Some(1), None).await;
        assert!(matches!(bad, Err(EditorError::Schema(_))));
    }

    #[tokio::test]
    async fn test_upload_json_saves_reference() {
        let fx = fixture();
        let (media, outcome) = upload_json(
            &fx.client,
            SectionKind::Hero,
            MediaTarget::Section,
            &MediaFile::new("hero.gif", png()),
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome, SaveOutcome::Inserted { version: 1 });

        let stored = fx.store.get("hero").await.unwrap().unwrap();
        assert_eq!(stored.content["image_url"], json!(media.url));
    }

    fn read_failing() -> Fixture {
        fixture_with(
            FaultInjector::builder(11)
                .with_fault(FaultConfig::always(FaultType::StoreReadFail))
                .build(),
            FaultInjector::none(),
        )
    }

    #[tokio::test]
    async fn test_read_failure_seeds_defaults_with_warning() {
        let fx = read_failing();
        let mut editor = fx.client.editor::<ProductsContent>();
        editor.load().await;

        assert_eq!(editor.state(), LoadState::ReadFailed);
        assert_eq!(editor.base_version(), None);
        assert_eq!(editor.document(), &ProductsContent::default());

        let notices = editor.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert!(notices[0].message.contains("featured_products"));
    }

    #[tokio::test]
    async fn test_upload_json_refuses_after_read_failure() {
        let fx = read_failing();
        let file = MediaFile::new("cloth.png", png());

        let err = upload_json(
            &fx.client,
            SectionKind::FeaturedProducts,
            MediaTarget::Entry(0),
            &file,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EditorError::Store(StoreError::Read(_))));
        assert!(fx.media.is_empty().await);
    }
}
