//! Frequently asked questions

use serde::{Deserialize, Serialize};

use super::{check_entry_count, check_text, ListSection, SchemaError, SectionSchema};

/// One question and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Question
    pub question: String,
    /// Answer
    pub answer: String,
}

/// FAQ document (`faq`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqContent {
    /// Section heading
    pub title: String,
    /// Section copy
    pub description: String,
    /// Entries in display order
    pub entries: Vec<FaqEntry>,
}

impl Default for FaqContent {
    fn default() -> Self {
        let entry = |q: &str, a: &str| FaqEntry {
            question: q.to_string(),
            answer: a.to_string(),
        };
        Self {
            title: "Frequently Asked Questions".to_string(),
            description: "Everything you need to know about caring for your microfibre cloths"
                .to_string(),
            entries: vec![
                entry(
                    "How do I wash my microfibre cloths?",
                    "Machine wash warm without fabric softener and air dry or tumble dry on low.",
                ),
                entry(
                    "Why are the edges ultrasonically cut?",
                    "Seamless edges have no stitching or labels that can swirl or scratch delicate finishes.",
                ),
                entry(
                    "Where can I buy Tiffany Sparkles?",
                    "Visit one of our partner stores listed under Find a Store, or contact us directly.",
                ),
            ],
        }
    }
}

impl SectionSchema for FaqContent {
    const SECTION: &'static str = "faq";
    const MEDIA_PREFIX: &'static str = "faq";

    fn validate(&self) -> Result<(), SchemaError> {
        check_text("title", &self.title)?;
        check_text("description", &self.description)?;
        check_entry_count("entries", self.entries.len())?;
        for (i, e) in self.entries.iter().enumerate() {
            check_text(&format!("entries/{i}/question"), &e.question)?;
            check_text(&format!("entries/{i}/answer"), &e.answer)?;
        }
        Ok(())
    }

    fn media_urls(&self) -> Vec<&str> {
        Vec::new()
    }
}

impl ListSection for FaqContent {
    type Entry = FaqEntry;

    fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    fn entries_mut(&mut self) -> &mut Vec<FaqEntry> {
        &mut self.entries
    }

    fn blank_entry() -> FaqEntry {
        FaqEntry {
            question: String::new(),
            answer: String::new(),
        }
    }
}
