//! Marketing slider

use serde::{Deserialize, Serialize};

use super::{
    check_entry_count, check_text, entry_mut, non_empty, ListSection, MediaRef, MediaTarget,
    SchemaError, SectionSchema,
};
use crate::carousel::Carousel;
use crate::media::MediaKind;

/// One slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingItem {
    /// Optional stable identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Image or video
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Media URL
    pub src: String,
    /// Overlay headline
    pub title: String,
    /// Overlay subline
    pub subtitle: String,
    /// Whether the title overlay is drawn
    pub overlay: bool,
}

impl MarketingItem {
    fn new(kind: MediaKind, src: &str, title: &str, subtitle: &str) -> Self {
        Self {
            id: None,
            kind,
            src: src.to_string(),
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            overlay: true,
        }
    }
}

/// Marketing slider document (`marketing_section`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingContent {
    /// Section heading
    pub title: String,
    /// Section copy
    pub description: String,
    /// Slides in display order
    pub items: Vec<MarketingItem>,
}

impl Default for MarketingContent {
    fn default() -> Self {
        Self {
            title: "Marketing Showcase".to_string(),
            description:
                "Discover our latest campaigns and see why customers choose Tiffany Sparkles"
                    .to_string(),
            items: vec![
                MarketingItem::new(
                    MediaKind::Image,
                    "https://images.unsplash.com/photo-1488590528505-98d2b5aba04b?q=80&w=2000",
                    "Revolutionary Cleaning Technology",
                    "Experience the future of microfiber",
                ),
                MarketingItem::new(
                    MediaKind::Image,
                    "https://images.unsplash.com/photo-1486312338219-ce68d2c6f44d?q=80&w=2000",
                    "Trusted by Professionals",
                    "Used in premium hotels and restaurants worldwide",
                ),
                MarketingItem::new(
                    MediaKind::Video,
                    "https://www.w3schools.com/html/mov_bbb.mp4",
                    "See the Difference",
                    "Watch our microfiber technology in action",
                ),
            ],
        }
    }
}

impl MarketingContent {
    /// Slider state for these items.
    #[must_use]
    pub fn carousel(&self) -> Carousel {
        Carousel::slider(self.items.len())
    }
}

impl SectionSchema for MarketingContent {
    const SECTION: &'static str = "marketing_section";
    const MEDIA_PREFIX: &'static str = "marketing";

    fn validate(&self) -> Result<(), SchemaError> {
        check_text("title", &self.title)?;
        check_text("description", &self.description)?;
        check_entry_count("items", self.items.len())?;
        for (i, item) in self.items.iter().enumerate() {
            check_text(&format!("items/{i}/title"), &item.title)?;
            check_text(&format!("items/{i}/subtitle"), &item.subtitle)?;
        }
        Ok(())
    }

    fn media_urls(&self) -> Vec<&str> {
        self.items.iter().filter_map(|i| non_empty(&i.src)).collect()
    }

    fn apply_media(&mut self, target: MediaTarget, media: &MediaRef) -> Result<(), SchemaError> {
        let MediaTarget::Entry(index) = target else {
            return Err(SchemaError::NoMediaField {
                section: Self::SECTION.to_string(),
            });
        };
        let item = entry_mut(&mut self.items, index)?;
        item.src = media.url.clone();
        item.kind = media.kind;
        Ok(())
    }

    /// The slider renders nothing without slides.
    fn is_renderable(&self) -> bool {
        !self.items.is_empty()
    }
}

impl ListSection for MarketingContent {
    type Entry = MarketingItem;

    fn entries(&self) -> &[MarketingItem] {
        &self.items
    }

    fn entries_mut(&mut self) -> &mut Vec<MarketingItem> {
        &mut self.items
    }

    fn blank_entry() -> MarketingItem {
        MarketingItem::new(MediaKind::Image, "", "", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{decode, encode};
    use serde_json::json;

    #[test]
    fn test_type_field_name_on_the_wire() {
        let value = encode(&MarketingContent::default()).unwrap();
        assert_eq!(value["items"][2]["type"], json!("video"));
        assert!(value["items"][0].get("id").is_none());
    }

    #[test]
    fn test_empty_items_not_renderable() {
        let content: MarketingContent =
            decode(&json!({"title": "t", "description": "d", "items": []})).unwrap();
        assert!(!content.is_renderable());
        assert!(MarketingContent::default().is_renderable());
    }

    #[test]
    fn test_apply_media_records_kind() {
        let mut content = MarketingContent::default();
        let media = MediaRef {
            url: "https://cdn/marketing-0-9.mp4".to_string(),
            kind: MediaKind::Video,
        };
        content.apply_media(MediaTarget::Entry(0), &media).unwrap();
        assert_eq!(content.items[0].kind, MediaKind::Video);
        assert_eq!(content.items[0].src, media.url);
    }

    #[test]
    fn test_blank_entry_has_overlay() {
        let blank = MarketingContent::blank_entry();
        assert!(blank.overlay);
        assert_eq!(blank.kind, MediaKind::Image);
    }
}
