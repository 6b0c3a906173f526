//! Featured products carousel

use serde::{Deserialize, Serialize};

use super::{
    check_entry_count, check_text, entry_mut, non_empty, ListSection, MediaRef, MediaTarget,
    SchemaError, SectionSchema,
};
use crate::constants::RATING_MAX;
use crate::media::MediaKind;

/// One product card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product name
    pub name: String,
    /// Short description
    pub description: String,
    /// Image URL
    pub image: String,
    /// Average rating, 0 to 5
    pub rating: f32,
    /// Display price, currency included
    pub price: String,
}

impl Product {
    fn new(name: &str, description: &str, image: &str, rating: f32, price: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            image: image.to_string(),
            rating,
            price: price.to_string(),
        }
    }

    /// Number of filled stars out of five.
    #[must_use]
    pub fn filled_stars(&self) -> u8 {
        // Truncation is the point: 4.9 shows four stars.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let stars = self.rating.clamp(0.0, RATING_MAX).floor() as u8;
        stars
    }
}

/// Featured products document (`featured_products`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductsContent {
    /// Section heading
    pub title: String,
    /// Section copy
    pub description: String,
    /// Cards in display order
    pub products: Vec<Product>,
}

impl Default for ProductsContent {
    fn default() -> Self {
        Self {
            title: "Featured Products".to_string(),
            description: "Discover our bestselling microfiber cloths, trusted by thousands of customers"
                .to_string(),
            products: vec![
                Product::new(
                    "Premium Multi-Surface Cloth",
                    "Perfect for glass, electronics, and delicate surfaces. Ultra-soft microfiber.",
                    "https://cdn.pixabay.com/photo/2017/05/01/08/56/microfiber-2279763_1280.jpg",
                    4.9,
                    "₹299",
                ),
                Product::new(
                    "Kitchen Pro Cleaning Set",
                    "Heavy-duty microfiber for kitchen counters, appliances, and tough stains.",
                    "https://cdn.pixabay.com/photo/2016/12/06/09/31/cleaning-1880367_1280.jpg",
                    4.8,
                    "₹499",
                ),
                Product::new(
                    "Car Care Collection",
                    "Specially designed for automotive surfaces. Scratch-free and lint-free.",
                    "https://cdn.pixabay.com/photo/2016/03/27/17/40/auto-1283631_1280.jpg",
                    4.9,
                    "₹699",
                ),
            ],
        }
    }
}

impl SectionSchema for ProductsContent {
    const SECTION: &'static str = "featured_products";
    const MEDIA_PREFIX: &'static str = "product";

    fn validate(&self) -> Result<(), SchemaError> {
        check_text("title", &self.title)?;
        check_text("description", &self.description)?;
        check_entry_count("products", self.products.len())?;
        for (i, product) in self.products.iter().enumerate() {
            check_text(&format!("products/{i}/name"), &product.name)?;
            check_text(&format!("products/{i}/description"), &product.description)?;
            if !(product.rating.is_finite() && (0.0..=RATING_MAX).contains(&product.rating)) {
                return Err(SchemaError::invalid(
                    format!("products/{i}/rating"),
                    format!("{} is outside 0..={RATING_MAX}", product.rating),
                ));
            }
        }
        Ok(())
    }

    fn media_urls(&self) -> Vec<&str> {
        self.products.iter().filter_map(|p| non_empty(&p.image)).collect()
    }

    fn apply_media(&mut self, target: MediaTarget, media: &MediaRef) -> Result<(), SchemaError> {
        let MediaTarget::Entry(index) = target else {
            return Err(SchemaError::NoMediaField {
                section: Self::SECTION.to_string(),
            });
        };
        if media.kind != MediaKind::Image {
            return Err(SchemaError::invalid(
                format!("products/{index}/image"),
                "product media must be an image",
            ));
        }
        entry_mut(&mut self.products, index)?.image = media.url.clone();
        Ok(())
    }
}

impl ListSection for ProductsContent {
    type Entry = Product;

    fn entries(&self) -> &[Product] {
        &self.products
    }

    fn entries_mut(&mut self) -> &mut Vec<Product> {
        &mut self.products
    }

    fn blank_entry() -> Product {
        Product::new("", "", "", RATING_MAX, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::decode;
    use serde_json::json;

    #[test]
    fn test_defaults_have_three_products() {
        let content = ProductsContent::default();
        assert_eq!(content.products.len(), 3);
        assert!(content.validate().is_ok());
    }

    #[test]
    fn test_filled_stars() {
        let mut product = ProductsContent::blank_entry();
        product.rating = 4.9;
        assert_eq!(product.filled_stars(), 4);
        product.rating = 5.0;
        assert_eq!(product.filled_stars(), 5);
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        let value = json!({
            "title": "t",
            "description": "d",
            "products": [{"name": "n", "description": "d", "image": "", "rating": 7.0, "price": "1"}]
        });
        let err = decode::<ProductsContent>(&value).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid { .. }));
    }

    #[test]
    fn test_blank_entry_matches_dashboard_add() {
        let blank = ProductsContent::blank_entry();
        assert_eq!(blank.rating, 5.0);
        assert!(blank.name.is_empty() && blank.image.is_empty());
    }

    #[test]
    fn test_apply_media_rejects_video_and_out_of_range() {
        let mut content = ProductsContent::default();
        let video = MediaRef {
            url: "u".to_string(),
            kind: MediaKind::Video,
        };
        assert!(content.apply_media(MediaTarget::Entry(0), &video).is_err());

        let image = MediaRef {
            url: "u".to_string(),
            kind: MediaKind::Image,
        };
        assert_eq!(
            content.apply_media(MediaTarget::Entry(9), &image),
            Err(SchemaError::IndexOutOfRange { index: 9, len: 3 })
        );
    }
}
