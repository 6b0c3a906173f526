//! Contact details shown in the footer

use serde::{Deserialize, Serialize};

use super::{check_entry_count, check_text, SchemaError, SectionSchema};

/// A social profile link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    /// Platform name
    pub platform: String,
    /// Profile URL
    pub url: String,
}

/// Contact document (`contact`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactContent {
    /// Section heading
    pub title: String,
    /// Section copy
    pub description: String,
    /// Contact e-mail
    pub email: String,
    /// Phone numbers as displayed
    pub phone: String,
    /// Postal address
    pub address: String,
    /// Social profiles
    #[serde(default)]
    pub social: Vec<SocialLink>,
}

impl Default for ContactContent {
    fn default() -> Self {
        Self {
            title: "Get in Touch".to_string(),
            description: "Questions about our cloths or becoming a stockist? We'd love to hear from you."
                .to_string(),
            email: "info@tiffanysparkles.com".to_string(),
            phone: "+254 718 151 622 || +447933901040".to_string(),
            address: "Kisumu, Kenya".to_string(),
            social: Vec::new(),
        }
    }
}

impl SectionSchema for ContactContent {
    const SECTION: &'static str = "contact";
    const MEDIA_PREFIX: &'static str = "contact";

    fn validate(&self) -> Result<(), SchemaError> {
        check_text("title", &self.title)?;
        check_text("description", &self.description)?;
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(SchemaError::invalid("email", "missing @"));
        }
        check_text("phone", &self.phone)?;
        check_text("address", &self.address)?;
        check_entry_count("social", self.social.len())
    }

    fn media_urls(&self) -> Vec<&str> {
        Vec::new()
    }
}
