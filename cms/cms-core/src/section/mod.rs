//! Sections - one explicit schema per section identifier
//!
//! Renderers and editors are generic over [`SectionSchema`], so the shape the
//! site reads is the shape the dashboard writes. Documents are decoded and
//! validated at the read boundary; anything that does not fit is rejected
//! rather than rendered half-broken.

mod contact;
mod faq;
mod hero;
mod locations;
mod marketing;
mod products;
mod testimonials;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{SECTION_ENTRIES_COUNT_MAX, TEXT_FIELD_BYTES_MAX};
use crate::media::MediaKind;

pub use contact::{ContactContent, SocialLink};
pub use faq::{FaqContent, FaqEntry};
pub use hero::HeroContent;
pub use locations::{LocationsContent, MapView, StoreLocation};
pub use marketing::{MarketingContent, MarketingItem};
pub use products::{Product, ProductsContent};
pub use testimonials::{Testimonial, TestimonialsContent};

// =============================================================================
// Errors
// =============================================================================

/// A document that does not satisfy its section's schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// JSON could not be decoded into the section type
    #[error("document for section {section} is malformed: {reason}")]
    Malformed {
        /// Section identifier
        section: String,
        /// Decoder message
        reason: String,
    },

    /// Decoded, but a field breaks a rule
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// JSON pointer-ish field path
        field: String,
        /// What is wrong
        reason: String,
    },

    /// Media was uploaded for a section or entry that has no media field
    #[error("section {section} has no media field")]
    NoMediaField {
        /// Section identifier
        section: String,
    },

    /// List position past the end
    #[error("entry index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested position
        index: usize,
        /// Current list length
        len: usize,
    },

    /// Field path that does not exist in the document
    #[error("unknown field {0}")]
    UnknownField(String),

    /// Section identifier not known to this site
    #[error("unknown section {0}")]
    UnknownSection(String),
}

impl SchemaError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Media references
// =============================================================================

/// A stored object as referenced from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Public URL written into the document
    pub url: String,
    /// Image or video
    pub kind: MediaKind,
}

/// Where an uploaded object goes inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "target", content = "index")]
pub enum MediaTarget {
    /// The section's own media field (hero image)
    Section,
    /// The media field of the list entry at this position
    Entry(usize),
}

impl MediaTarget {
    /// Position used in generated object names.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Section => 0,
            Self::Entry(i) => *i,
        }
    }
}

// =============================================================================
// Schema traits
// =============================================================================

/// The schema of one section's document.
pub trait SectionSchema:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static
{
    /// Section identifier the document is stored under.
    const SECTION: &'static str;

    /// Prefix of generated media object names.
    const MEDIA_PREFIX: &'static str;

    /// Check field-level rules beyond what decoding enforces.
    ///
    /// # Errors
    /// Returns the first rule that is broken.
    fn validate(&self) -> Result<(), SchemaError>;

    /// Every media URL the document references.
    fn media_urls(&self) -> Vec<&str>;

    /// Write an uploaded object's URL into the document.
    ///
    /// # Errors
    /// Returns error if the target has no media field or is out of range.
    fn apply_media(&mut self, target: MediaTarget, media: &MediaRef) -> Result<(), SchemaError> {
        let _ = (target, media);
        Err(SchemaError::NoMediaField {
            section: Self::SECTION.to_string(),
        })
    }

    /// Whether the visitor view has anything to show. Stored documents that
    /// are not renderable are replaced by defaults.
    fn is_renderable(&self) -> bool {
        true
    }

    /// The document as visitors see it (filtered, ordered, capped).
    #[must_use]
    fn for_visitors(self) -> Self {
        self
    }
}

/// A section whose document carries an ordered list of entries.
pub trait ListSection: SectionSchema {
    /// One list entry.
    type Entry: Clone + PartialEq + std::fmt::Debug + Send + Sync;

    /// The entries, in display order.
    fn entries(&self) -> &[Self::Entry];

    /// Mutable access to the entries.
    fn entries_mut(&mut self) -> &mut Vec<Self::Entry>;

    /// Entry appended by "add".
    fn blank_entry() -> Self::Entry;
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode and validate a stored document.
///
/// # Errors
/// Returns [`SchemaError::Malformed`] when the JSON does not fit the type, or
/// the validation error.
pub fn decode<S: SectionSchema>(value: &Value) -> Result<S, SchemaError> {
    let document: S = S::deserialize(value).map_err(|e| SchemaError::Malformed {
        section: S::SECTION.to_string(),
        reason: e.to_string(),
    })?;
    document.validate()?;
    Ok(document)
}

/// Encode a document for storage.
///
/// # Errors
/// Returns [`SchemaError::Malformed`] if serialization fails.
pub fn encode<S: SectionSchema>(document: &S) -> Result<Value, SchemaError> {
    serde_json::to_value(document).map_err(|e| SchemaError::Malformed {
        section: S::SECTION.to_string(),
        reason: e.to_string(),
    })
}

/// Replace one existing field, addressed by JSON pointer (`/title`,
/// `/products/1/price`), and re-validate. The document is unchanged on error.
///
/// # Errors
/// Returns [`SchemaError::UnknownField`] if the pointer does not resolve, or a
/// decode/validation error if the new value breaks the schema.
pub fn set_field<S: SectionSchema>(
    document: &mut S,
    pointer: &str,
    value: Value,
) -> Result<(), SchemaError> {
    let mut raw = encode(document)?;
    let slot = raw
        .pointer_mut(pointer)
        .ok_or_else(|| SchemaError::UnknownField(pointer.to_string()))?;
    if slot.is_array() || slot.is_object() {
        return Err(SchemaError::invalid(pointer, "not a scalar field"));
    }
    *slot = value;
    *document = decode(&raw)?;
    Ok(())
}

// =============================================================================
// Shared rules
// =============================================================================

pub(crate) fn check_text(field: &str, value: &str) -> Result<(), SchemaError> {
    if value.len() > TEXT_FIELD_BYTES_MAX {
        return Err(SchemaError::invalid(
            field,
            format!("{} bytes exceeds max {TEXT_FIELD_BYTES_MAX}", value.len()),
        ));
    }
    Ok(())
}

pub(crate) fn check_entry_count(field: &str, len: usize) -> Result<(), SchemaError> {
    if len > SECTION_ENTRIES_COUNT_MAX {
        return Err(SchemaError::invalid(
            field,
            format!("{len} entries exceeds max {SECTION_ENTRIES_COUNT_MAX}"),
        ));
    }
    Ok(())
}

pub(crate) fn entry_mut<T>(entries: &mut [T], index: usize) -> Result<&mut T, SchemaError> {
    let len = entries.len();
    entries
        .get_mut(index)
        .ok_or(SchemaError::IndexOutOfRange { index, len })
}

pub(crate) fn non_empty(url: &str) -> Option<&str> {
    (!url.is_empty()).then_some(url)
}

// =============================================================================
// SectionKind
// =============================================================================

/// Every section the site knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Hero banner
    Hero,
    /// Product carousel
    FeaturedProducts,
    /// Marketing slider
    MarketingSection,
    /// Customer testimonials
    Testimonials,
    /// Frequently asked questions
    Faq,
    /// Store locations
    Locations,
    /// Contact details
    Contact,
}

impl SectionKind {
    /// Get string representation (the section identifier).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hero => HeroContent::SECTION,
            Self::FeaturedProducts => ProductsContent::SECTION,
            Self::MarketingSection => MarketingContent::SECTION,
            Self::Testimonials => TestimonialsContent::SECTION,
            Self::Faq => FaqContent::SECTION,
            Self::Locations => LocationsContent::SECTION,
            Self::Contact => ContactContent::SECTION,
        }
    }

    /// Parse a section identifier.
    #[must_use]
    pub fn from_id(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.as_str() == s)
    }

    /// Parse a section identifier, as a schema error.
    ///
    /// # Errors
    /// Returns [`SchemaError::UnknownSection`] for identifiers not in
    /// [`SectionKind::all`].
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        Self::from_id(s).ok_or_else(|| SchemaError::UnknownSection(s.to_string()))
    }

    /// All sections in dashboard order.
    #[must_use]
    pub fn all() -> &'static [SectionKind] {
        &[
            Self::Hero,
            Self::FeaturedProducts,
            Self::MarketingSection,
            Self::Testimonials,
            Self::Faq,
            Self::Locations,
            Self::Contact,
        ]
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run a generic expression with the schema type of a [`SectionKind`].
///
/// ```
/// use cms_core::for_section;
/// use cms_core::section::{SectionKind, SectionSchema};
///
/// let prefix = for_section!(SectionKind::FeaturedProducts, S => S::MEDIA_PREFIX);
/// assert_eq!(prefix, "product");
/// ```
#[macro_export]
macro_rules! for_section {
    ($kind:expr, $schema:ident => $body:expr) => {
        match $kind {
            $crate::section::SectionKind::Hero => {
                type $schema = $crate::section::HeroContent;
                $body
            }
            $crate::section::SectionKind::FeaturedProducts => {
                type $schema = $crate::section::ProductsContent;
                $body
            }
            $crate::section::SectionKind::MarketingSection => {
                type $schema = $crate::section::MarketingContent;
                $body
            }
            $crate::section::SectionKind::Testimonials => {
                type $schema = $crate::section::TestimonialsContent;
                $body
            }
            $crate::section::SectionKind::Faq => {
                type $schema = $crate::section::FaqContent;
                $body
            }
            $crate::section::SectionKind::Locations => {
                type $schema = $crate::section::LocationsContent;
                $body
            }
            $crate::section::SectionKind::Contact => {
                type $schema = $crate::section::ContactContent;
                $body
            }
        }
    };
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_kind_round_trip() {
        for kind in SectionKind::all() {
            assert_eq!(SectionKind::from_id(kind.as_str()), Some(*kind));
        }
        assert_eq!(SectionKind::from_id("pricing"), None);
        assert!(matches!(
            SectionKind::parse("pricing"),
            Err(SchemaError::UnknownSection(_))
        ));
    }

    #[test]
    fn test_decode_malformed_list() {
        let value = json!({"title": "t", "description": "d", "products": "not a list"});
        let err = decode::<ProductsContent>(&value).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
    }

    #[test]
    fn test_set_field_scalar() {
        let mut hero = HeroContent::default();
        set_field(&mut hero, "/title", json!("Sparkle On")).unwrap();
        assert_eq!(hero.title, "Sparkle On");
    }

    #[test]
    fn test_set_field_nested_entry() {
        let mut products = ProductsContent::default();
        set_field(&mut products, "/products/1/price", json!("₹549")).unwrap();
        assert_eq!(products.products[1].price, "₹549");
    }

    #[test]
    fn test_set_field_wrong_type_leaves_document() {
        let mut products = ProductsContent::default();
        let before = products.clone();
        let err = set_field(&mut products, "/products/0/rating", json!("five")).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
        assert_eq!(products, before);
    }

    #[test]
    fn test_set_field_unknown_and_non_scalar() {
        let mut hero = HeroContent::default();
        assert!(matches!(
            set_field(&mut hero, "/headline", json!("x")),
            Err(SchemaError::UnknownField(_))
        ));

        let mut products = ProductsContent::default();
        assert!(matches!(
            set_field(&mut products, "/products", json!([])),
            Err(SchemaError::Invalid { .. })
        ));
    }

    #[test]
    fn test_media_target_serde() {
        let target: MediaTarget = serde_json::from_value(json!({"target": "entry", "index": 2})).unwrap();
        assert_eq!(target, MediaTarget::Entry(2));
        let target: MediaTarget = serde_json::from_value(json!({"target": "section"})).unwrap();
        assert_eq!(target, MediaTarget::Section);
    }
}
