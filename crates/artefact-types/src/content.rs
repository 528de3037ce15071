//! Content produced by the generator and the inputs it consumes.

use serde::{Deserialize, Serialize};

use crate::CalendarKey;
use crate::translation::TranslatableFields;

/// One structured pick returned by the content generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    /// Narration shown alongside the artefact.
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    /// Free-text directive handed to the image generation service.
    pub model_prompt: String,
    /// Summary of the source event the artefact was derived from.
    pub source_event: String,
}

impl GeneratedContent {
    /// The subset of fields that gets translated.
    pub fn translatable(&self) -> TranslatableFields {
        TranslatableFields {
            title: self.title.clone(),
            description: self.description.clone(),
            location_name: self.location_name.clone(),
            source_event: self.source_event.clone(),
        }
    }
}

/// A candidate source item (news result) offered to the content generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// Read-only projection of a recent record, used to avoid repeating themes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub key: CalendarKey,
    pub title: String,
    pub source_event: String,
}
