//! Media classification and object naming

use serde::{Deserialize, Serialize};

use crate::constants::{MEDIA_EXTENSION_BYTES_MAX, MEDIA_NAME_BYTES_MAX};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Extensions transcoded to WebP before upload.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"];

/// Extensions uploaded as video, unchanged.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov"];

/// Extension of every transcoded image.
pub const WEBP_EXTENSION: &str = "webp";

/// Content type of every transcoded image.
pub const WEBP_CONTENT_TYPE: &str = "image/webp";

/// Extension used when a video file has none.
pub const FALLBACK_EXTENSION: &str = "bin";

// =============================================================================
// MediaKind
// =============================================================================

/// Whether an uploaded object is displayed as an image or a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Raster image, stored as WebP
    #[default]
    Image,
    /// Video, stored as uploaded
    Video,
}

impl MediaKind {
    /// Classify a file by its extension.
    ///
    /// Known raster extensions are images; everything else, including files
    /// without an extension, is treated as video.
    #[must_use]
    pub fn classify(file_name: &str) -> Self {
        match extension(file_name) {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => Self::Image,
            _ => Self::Video,
        }
    }

    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Lowercased extension after the last dot, if any. Extensions longer than
/// `MEDIA_EXTENSION_BYTES_MAX` or with non-alphanumeric bytes count as none.
#[must_use]
pub fn extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MEDIA_EXTENSION_BYTES_MAX
        || !ext.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Content type for an extension as it will be stored.
#[must_use]
pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "webp" => WEBP_CONTENT_TYPE,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Extension the stored object will carry.
#[must_use]
pub fn stored_extension(kind: MediaKind, file_name: &str) -> String {
    match kind {
        MediaKind::Image => WEBP_EXTENSION.to_string(),
        MediaKind::Video => extension(file_name).unwrap_or_else(|| FALLBACK_EXTENSION.to_string()),
    }
}

/// Generated object name: `{prefix}-{index}-{timestamp_ms}.{ext}`.
///
/// # Panics
/// Panics if the prefix is empty or the name exceeds `MEDIA_NAME_BYTES_MAX`.
#[must_use]
pub fn object_name(prefix: &str, index: usize, timestamp_ms: u64, ext: &str) -> String {
    // Preconditions
    assert!(!prefix.is_empty(), "media prefix cannot be empty");

    let name = format!("{prefix}-{index}-{timestamp_ms}.{ext}");

    // Postcondition
    assert!(
        name.len() <= MEDIA_NAME_BYTES_MAX,
        "object name {} bytes exceeds max {}",
        name.len(),
        MEDIA_NAME_BYTES_MAX
    );
    name
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_images() {
        assert_eq!(MediaKind::classify("cloth.PNG"), MediaKind::Image);
        assert_eq!(MediaKind::classify("photo.jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::classify("dir/banner.webp"), MediaKind::Image);
    }

    #[test]
    fn test_classify_videos() {
        assert_eq!(MediaKind::classify("clip.mp4"), MediaKind::Video);
        assert_eq!(MediaKind::classify("clip.MOV"), MediaKind::Video);
    }

    #[test]
    fn test_unknown_extension_is_video() {
        assert_eq!(MediaKind::classify("brochure.pdf"), MediaKind::Video);
        assert_eq!(MediaKind::classify("README"), MediaKind::Video);
        assert_eq!(MediaKind::classify(".hidden"), MediaKind::Video);
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("a.b.JPG"), Some("jpg".to_string()));
        assert_eq!(extension("noext"), None);
        assert_eq!(extension("trailing."), None);
        assert_eq!(extension("x.abcdefghijklmnopq"), None);
    }

    #[test]
    fn test_stored_extension() {
        assert_eq!(stored_extension(MediaKind::Image, "x.png"), "webp");
        assert_eq!(stored_extension(MediaKind::Video, "x.webm"), "webm");
        assert_eq!(stored_extension(MediaKind::Video, "x"), "bin");
    }

    #[test]
    fn test_object_name() {
        assert_eq!(
            object_name("product", 2, 1_700_000_000_000, "webp"),
            "product-2-1700000000000.webp"
        );
    }

    #[test]
    fn test_kind_serde() {
        assert_eq!(serde_json::to_string(&MediaKind::Video).unwrap(), "\"video\"");
        let kind: MediaKind = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(kind, MediaKind::Image);
    }
}
