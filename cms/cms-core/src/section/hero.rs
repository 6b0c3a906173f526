//! Hero banner

use serde::{Deserialize, Serialize};

use super::{check_text, non_empty, MediaRef, MediaTarget, SchemaError, SectionSchema};
use crate::media::MediaKind;

/// Hero banner document (`hero`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroContent {
    /// Headline; the second word is highlighted on the site
    pub title: String,
    /// Line under the headline
    pub subtitle: String,
    /// Body copy
    pub description: String,
    /// Background image, empty for none
    #[serde(default)]
    pub image_url: String,
}

impl Default for HeroContent {
    fn default() -> Self {
        Self {
            title: "Tiffany Sparkles".to_string(),
            subtitle: "Premium Microfiber Excellence".to_string(),
            description: "Experience the ultimate in cleaning technology with our superior \
                          microfiber cloths. Designed for modern lifestyles, crafted with \
                          precision, and built to last."
                .to_string(),
            image_url: String::new(),
        }
    }
}

impl HeroContent {
    /// Headline words paired with whether the site highlights them.
    #[must_use]
    pub fn title_words(&self) -> Vec<(&str, bool)> {
        self.title
            .split_whitespace()
            .enumerate()
            .map(|(i, word)| (word, i == 1))
            .collect()
    }
}

impl SectionSchema for HeroContent {
    const SECTION: &'static str = "hero";
    const MEDIA_PREFIX: &'static str = "hero";

    fn validate(&self) -> Result<(), SchemaError> {
        check_text("title", &self.title)?;
        check_text("subtitle", &self.subtitle)?;
        check_text("description", &self.description)?;
        check_text("image_url", &self.image_url)
    }

    fn media_urls(&self) -> Vec<&str> {
        non_empty(&self.image_url).into_iter().collect()
    }

    fn apply_media(&mut self, target: MediaTarget, media: &MediaRef) -> Result<(), SchemaError> {
        match (target, media.kind) {
            (MediaTarget::Section, MediaKind::Image) => {
                self.image_url = media.url.clone();
                Ok(())
            }
            (MediaTarget::Section, MediaKind::Video) => {
                Err(SchemaError::invalid("image_url", "hero media must be an image"))
            }
            (MediaTarget::Entry(_), _) => Err(SchemaError::NoMediaField {
                section: Self::SECTION.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::decode;
    use serde_json::json;

    #[test]
    fn test_default_title() {
        assert_eq!(HeroContent::default().title, "Tiffany Sparkles");
    }

    #[test]
    fn test_title_words_highlight_second() {
        let hero = HeroContent::default();
        assert_eq!(hero.title_words(), vec![("Tiffany", false), ("Sparkles", true)]);
    }

    #[test]
    fn test_missing_image_url_defaults_empty() {
        let hero: HeroContent =
            decode(&json!({"title": "a", "subtitle": "b", "description": "c"})).unwrap();
        assert!(hero.image_url.is_empty());
        assert!(hero.media_urls().is_empty());
    }

    #[test]
    fn test_apply_media() {
        let mut hero = HeroContent::default();
        let media = MediaRef {
            url: "https://cdn/hero-0-1.webp".to_string(),
            kind: MediaKind::Image,
        };
        hero.apply_media(MediaTarget::Section, &media).unwrap();
        assert_eq!(hero.media_urls(), vec!["https://cdn/hero-0-1.webp"]);

        assert!(hero.apply_media(MediaTarget::Entry(0), &media).is_err());
    }
}
