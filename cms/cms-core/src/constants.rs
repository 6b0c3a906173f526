//! Constants - TigerStyle limits and defaults
//!
//! Every limit is named `<THING>_<UNIT>_MAX` and every default
//! `<THING>_DEFAULT`, so call sites read as the invariant they enforce.

// =============================================================================
// Time
// =============================================================================

/// Milliseconds per second.
pub const TIME_MS_PER_SEC: u64 = 1_000;

/// Largest single step a simulated clock may take (one day).
pub const DST_TIME_ADVANCE_MS_MAX: u64 = 24 * 60 * 60 * TIME_MS_PER_SEC;

// =============================================================================
// Documents
// =============================================================================

/// Maximum length of a section identifier in bytes.
pub const SECTION_ID_BYTES_MAX: usize = 64;

/// Maximum serialized size of one content document in bytes.
pub const DOCUMENT_CONTENT_BYTES_MAX: usize = 1_048_576;

/// Maximum number of entries in any list section.
pub const SECTION_ENTRIES_COUNT_MAX: usize = 100;

/// Maximum length of a scalar text field in bytes.
pub const TEXT_FIELD_BYTES_MAX: usize = 10_000;

/// Highest rating a product or testimonial may carry.
pub const RATING_MAX: f32 = 5.0;

// =============================================================================
// Media
// =============================================================================

/// Default object storage bucket.
pub const MEDIA_BUCKET_DEFAULT: &str = "cms-images";

/// Maximum length of a generated object name in bytes.
pub const MEDIA_NAME_BYTES_MAX: usize = 256;

/// Longest file extension carried into an object name.
pub const MEDIA_EXTENSION_BYTES_MAX: usize = 16;

/// Maximum size of one uploaded object in bytes (100 MiB).
pub const MEDIA_UPLOAD_BYTES_MAX: usize = 100 * 1024 * 1024;

/// Upload chunk size; progress is reported once per chunk.
pub const MEDIA_UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Lifetime of a pre-signed upload target in milliseconds (two hours).
pub const MEDIA_SIGNED_UPLOAD_TTL_MS: u64 = 2 * 60 * 60 * TIME_MS_PER_SEC;

/// Random bytes in a pre-signed upload token.
pub const MEDIA_UPLOAD_TOKEN_BYTES: usize = 24;

/// WebP quality used when transcoding raster images.
pub const WEBP_QUALITY_DEFAULT: u8 = 90;

/// Unreferenced objects younger than this survive a sweep (one hour).
pub const MEDIA_GC_GRACE_MS_DEFAULT: u64 = 60 * 60 * TIME_MS_PER_SEC;

// =============================================================================
// Renderers
// =============================================================================

/// Testimonials shown on the public site.
pub const TESTIMONIALS_VISIBLE_COUNT_MAX: usize = 4;

/// Carousel auto-advance interval in milliseconds.
pub const CAROUSEL_INTERVAL_MS: u64 = 5_000;

/// Map center used when no location carries coordinates (Nairobi).
pub const MAP_CENTER_DEFAULT: (f64, f64) = (-1.286_389, 36.817_223);
