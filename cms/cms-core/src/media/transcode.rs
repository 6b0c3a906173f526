//! Image transcoding to WebP
//!
//! Decoding and encoding are CPU-bound, so they run on the blocking pool.

use async_trait::async_trait;
use bytes::Bytes;

use super::store::{MediaError, MediaResult};
use crate::constants::WEBP_QUALITY_DEFAULT;

/// Converts uploaded raster images to the stored format.
#[async_trait]
pub trait ImageTranscoder: Send + Sync + std::fmt::Debug {
    /// Transcode `source` (any supported raster format) to WebP.
    ///
    /// # Errors
    /// Returns [`MediaError::Transcode`] if the image cannot be decoded or
    /// encoded.
    async fn to_webp(&self, source: Bytes) -> MediaResult<Bytes>;
}

/// Lossy WebP transcoder: `image` decodes, libwebp encodes at `quality`.
#[derive(Debug, Clone, Copy)]
pub struct WebpTranscoder {
    quality: u8,
}

impl WebpTranscoder {
    /// Create a transcoder with the given quality (1..=100).
    ///
    /// # Panics
    /// Panics if quality is outside 1..=100.
    #[must_use]
    pub fn new(quality: u8) -> Self {
        assert!((1..=100).contains(&quality), "webp quality must be 1..=100, got {quality}");
        Self { quality }
    }

    /// Configured quality.
    #[must_use]
    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for WebpTranscoder {
    fn default() -> Self {
        Self::new(WEBP_QUALITY_DEFAULT)
    }
}

fn encode_webp(source: &[u8], quality: u8) -> MediaResult<Vec<u8>> {
    let decoded = image::load_from_memory(source)
        .map_err(|e| MediaError::Transcode(format!("decode: {e}")))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let out = webp::Encoder::from_rgba(rgba.as_raw(), width, height)
        .encode_simple(false, f32::from(quality))
        .map_err(|e| MediaError::Transcode(format!("encode: {e:?}")))?
        .to_vec();

    // Postcondition
    assert!(out.len() >= 12, "webp output must carry a RIFF header");
    Ok(out)
}

#[async_trait]
impl ImageTranscoder for WebpTranscoder {
    async fn to_webp(&self, source: Bytes) -> MediaResult<Bytes> {
        let input_bytes = source.len();
        let quality = self.quality;
        let out = tokio::task::spawn_blocking(move || encode_webp(&source, quality))
            .await
            .map_err(|e| MediaError::Transcode(format!("worker failed: {e}")))??;

        tracing::debug!(
            input_bytes,
            output_bytes = out.len(),
            quality = self.quality,
            "Transcoded image to webp"
        );
        Ok(Bytes::from(out))
    }
}

/// Whether `bytes` is a WebP container.
#[must_use]
pub fn is_webp(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

// =============================================================================
// Tests
// =============================================================================
