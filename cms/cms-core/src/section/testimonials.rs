//! Customer testimonials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    check_entry_count, check_text, entry_mut, ListSection, MediaRef, MediaTarget, SchemaError,
    SectionSchema,
};
use crate::carousel::Carousel;
use crate::constants::TESTIMONIALS_VISIBLE_COUNT_MAX;
use crate::media::MediaKind;

fn default_active() -> bool {
    true
}

/// One testimonial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    /// Stable identifier
    pub id: String,
    /// Customer or business name
    pub name: String,
    /// City
    pub location: String,
    /// Stars, 1 to 5
    pub rating: u8,
    /// Quote
    pub message: String,
    /// Optional avatar image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Hidden from the site when false
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Newest testimonials are shown first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Testimonial {
    fn new(id: &str, name: &str, location: &str, message: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            location: location.to_string(),
            rating: 5,
            message: message.to_string(),
            avatar_url: None,
            is_active: true,
            created_at: None,
        }
    }
}

/// Testimonials document (`testimonials`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestimonialsContent {
    /// Section heading
    pub title: String,
    /// Section copy
    pub description: String,
    /// All testimonials, including inactive ones
    pub testimonials: Vec<Testimonial>,
}

impl Default for TestimonialsContent {
    fn default() -> Self {
        Self {
            title: "What Our Customers Say".to_string(),
            description: "Join thousands of satisfied customers who trust Tiffany Sparkles for \
                          their premium cleaning needs."
                .to_string(),
            testimonials: vec![
                Testimonial::new(
                    "1",
                    "Priya Sharma",
                    "Mumbai",
                    "These Microfibre cloths are amazing! They clean my glass surfaces without \
                     any streaks. Best purchase I've made for my home.",
                ),
                Testimonial::new(
                    "2",
                    "Rajesh Kumar",
                    "Delhi",
                    "I use Tiffany Sparkles cloths for my car detailing business. Customers \
                     always ask what makes the finish so perfect!",
                ),
                Testimonial::new(
                    "3",
                    "Sneha Patel",
                    "Bangalore",
                    "Finally found cloths that don't leave lint on my electronics. The quality \
                     is outstanding and they last so long.",
                ),
                Testimonial::new(
                    "4",
                    "Modern Home Store",
                    "Pune",
                    "Our customers love these products. We've been stocking Tiffany Sparkles \
                     for 2 years now - excellent quality and reliability.",
                ),
            ],
        }
    }
}

impl TestimonialsContent {
    /// What the site shows: active testimonials, newest first, at most
    /// `TESTIMONIALS_VISIBLE_COUNT_MAX`. Undated entries keep their stored
    /// order after dated ones.
    #[must_use]
    pub fn visible(&self) -> Vec<&Testimonial> {
        let mut active: Vec<&Testimonial> =
            self.testimonials.iter().filter(|t| t.is_active).collect();
        // Stable sort: Some(newer) > Some(older) > None.
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        active.truncate(TESTIMONIALS_VISIBLE_COUNT_MAX);
        active
    }

    /// Rotation over the visible testimonials.
    #[must_use]
    pub fn carousel(&self) -> Carousel {
        Carousel::rotator(self.visible().len())
    }
}

impl SectionSchema for TestimonialsContent {
    const SECTION: &'static str = "testimonials";
    const MEDIA_PREFIX: &'static str = "testimonial";

    fn validate(&self) -> Result<(), SchemaError> {
        check_text("title", &self.title)?;
        check_text("description", &self.description)?;
        check_entry_count("testimonials", self.testimonials.len())?;
        for (i, t) in self.testimonials.iter().enumerate() {
            check_text(&format!("testimonials/{i}/message"), &t.message)?;
            if !(1..=5).contains(&t.rating) {
                return Err(SchemaError::invalid(
                    format!("testimonials/{i}/rating"),
                    format!("{} is outside 1..=5", t.rating),
                ));
            }
        }
        Ok(())
    }

    fn media_urls(&self) -> Vec<&str> {
        self.testimonials
            .iter()
            .filter_map(|t| t.avatar_url.as_deref())
            .filter(|url| !url.is_empty())
            .collect()
    }

    fn apply_media(&mut self, target: MediaTarget, media: &MediaRef) -> Result<(), SchemaError> {
        let MediaTarget::Entry(index) = target else {
            return Err(SchemaError::NoMediaField {
                section: Self::SECTION.to_string(),
            });
        };
        if media.kind != MediaKind::Image {
            return Err(SchemaError::invalid(
                format!("testimonials/{index}/avatar_url"),
                "avatar must be an image",
            ));
        }
        entry_mut(&mut self.testimonials, index)?.avatar_url = Some(media.url.clone());
        Ok(())
    }

    /// Nothing to show when no testimonial is active.
    fn is_renderable(&self) -> bool {
        self.testimonials.iter().any(|t| t.is_active)
    }

    fn for_visitors(self) -> Self {
        let testimonials = self.visible().into_iter().cloned().collect();
        Self {
            testimonials,
            ..self
        }
    }
}

impl ListSection for TestimonialsContent {
    type Entry = Testimonial;

    fn entries(&self) -> &[Testimonial] {
        &self.testimonials
    }

    fn entries_mut(&mut self) -> &mut Vec<Testimonial> {
        &mut self.testimonials
    }

    fn blank_entry() -> Testimonial {
        Testimonial::new(&uuid::Uuid::new_v4().to_string(), "", "", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(id: &str, ms: i64, active: bool) -> Testimonial {
        let mut t = Testimonial::new(id, id, "Kisumu", "Great");
        t.created_at = DateTime::from_timestamp_millis(ms);
        t.is_active = active;
        t
    }

    #[test]
    fn test_visible_newest_first_active_only_capped() {
        let content = TestimonialsContent {
            testimonials: vec![
                dated("a", 1_000, true),
                dated("b", 5_000, true),
                dated("c", 3_000, false),
                dated("d", 4_000, true),
                dated("e", 2_000, true),
                dated("f", 6_000, true),
            ],
            ..TestimonialsContent::default()
        };

        let ids: Vec<_> = content.visible().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["f", "b", "d", "e"]);
    }

    #[test]
    fn test_defaults_are_all_visible() {
        let content = TestimonialsContent::default();
        assert_eq!(content.visible().len(), 4);
        assert!(content.is_renderable());
    }

    #[test]
    fn test_all_inactive_not_renderable() {
        let content = TestimonialsContent {
            testimonials: vec![dated("a", 1, false)],
            ..TestimonialsContent::default()
        };
        assert!(!content.is_renderable());
    }

    #[test]
    fn test_rating_zero_rejected() {
        let mut content = TestimonialsContent::default();
        content.testimonials[0].rating = 0;
        assert!(content.validate().is_err());
    }

    #[test]
    fn test_blank_entries_get_distinct_ids() {
        assert_ne!(
            TestimonialsContent::blank_entry().id,
            TestimonialsContent::blank_entry().id
        );
    }
}
