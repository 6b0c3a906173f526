//! MediaPipeline - classify, transcode, sign, upload, resolve
//!
//! TigerStyle: the pipeline never touches a document. It returns a
//! [`MediaRef`] and leaves writing it into a field to the caller, so a
//! failure at any step cannot disturb the previous media URL.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;

use super::kind::{content_type_for, object_name, stored_extension, MediaKind, WEBP_CONTENT_TYPE};
use super::store::{MediaError, MediaResult, MediaStore, UploadProgress};
use super::transcode::{ImageTranscoder, WebpTranscoder};
use crate::constants::MEDIA_UPLOAD_BYTES_MAX;
use crate::dst::Clock;
use crate::section::MediaRef;

/// A file picked by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Original file name (only the extension is used)
    pub file_name: String,
    /// File contents
    pub bytes: Bytes,
}

impl MediaFile {
    /// Create a media file.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Image or video, by extension.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        MediaKind::classify(&self.file_name)
    }
}

/// Upload pipeline bound to one object store.
#[derive(Debug, Clone)]
pub struct MediaPipeline {
    media: Arc<dyn MediaStore>,
    transcoder: Arc<dyn ImageTranscoder>,
    clock: Arc<dyn Clock>,
}

impl MediaPipeline {
    /// Create a pipeline with the default WebP transcoder.
    #[must_use]
    pub fn new(media: Arc<dyn MediaStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_transcoder(media, Arc::new(WebpTranscoder::default()), clock)
    }

    /// Create a pipeline with a custom transcoder.
    #[must_use]
    pub fn with_transcoder(
        media: Arc<dyn MediaStore>,
        transcoder: Arc<dyn ImageTranscoder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            media,
            transcoder,
            clock,
        }
    }

    /// Object store the pipeline uploads into.
    #[must_use]
    pub fn media(&self) -> &Arc<dyn MediaStore> {
        &self.media
    }

    /// Run the whole upload for one file and return its public reference.
    ///
    /// Images are transcoded to WebP; everything else is uploaded as-is.
    /// Progress is published on `progress` after every acknowledged chunk.
    ///
    /// # Errors
    /// Returns the first failing step: transcode, sign or transfer.
    pub async fn upload(
        &self,
        prefix: &str,
        index: usize,
        file: &MediaFile,
        progress: Option<&watch::Sender<UploadProgress>>,
    ) -> MediaResult<MediaRef> {
        if file.bytes.len() > MEDIA_UPLOAD_BYTES_MAX {
            return Err(MediaError::TooLarge {
                size: file.bytes.len(),
                max: MEDIA_UPLOAD_BYTES_MAX,
            });
        }

        let kind = file.kind();
        let ext = stored_extension(kind, &file.file_name);
        let (body, content_type) = match kind {
            MediaKind::Image => (
                self.transcoder.to_webp(file.bytes.clone()).await?,
                WEBP_CONTENT_TYPE,
            ),
            MediaKind::Video => (file.bytes.clone(), content_type_for(&ext)),
        };

        let name = object_name(prefix, index, self.clock.now_ms(), &ext);
        let signed = self.media.create_signed_upload(&name).await?;
        let object = self
            .media
            .upload_signed(&signed.token, content_type, body, progress)
            .await?;

        let url = self.media.public_url(&object.name);
        tracing::info!(
            object = %object.name,
            kind = %kind,
            size = object.size,
            "Uploaded media"
        );

        // Postcondition
        assert_eq!(
            self.media.object_name_for_url(&url),
            Some(object.name.as_str()),
            "public url must resolve back to the stored object"
        );
        Ok(MediaRef { url, kind })
    }
}

// =============================================================================
// Tests
// =============================================================================
