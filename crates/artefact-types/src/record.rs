//! The durable artefact record, one per calendar key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::translation::{TranslatableFields, Translations};
use crate::{CalendarKey, Error, GeneratedContent};

/// Lifecycle status of an artefact record.
///
/// Records move forward only: `generating -> completed` or
/// `generating -> failed`. `pending` is accepted when reading older rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtefactStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl ArtefactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ArtefactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtefactStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "generating" => Ok(Self::Generating),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// One artefact, as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtefactRecord {
    pub id: i64,
    pub key: CalendarKey,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub model_prompt: String,
    pub source_event: String,
    /// Reference to the stored binary asset. Empty until completed.
    pub asset_ref: String,
    /// Opaque pipeline checkpoint. Present only while not completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_state: Option<String>,
    pub status: ArtefactStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<Translations>,
    pub created_at: DateTime<Utc>,
}

impl ArtefactRecord {
    pub fn is_completed(&self) -> bool {
        self.status == ArtefactStatus::Completed
    }

    /// The generated content carried by this record.
    pub fn content(&self) -> GeneratedContent {
        GeneratedContent {
            title: self.title.clone(),
            description: self.description.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            location_name: self.location_name.clone(),
            model_prompt: self.model_prompt.clone(),
            source_event: self.source_event.clone(),
        }
    }

    pub fn translatable(&self) -> TranslatableFields {
        self.content().translatable()
    }

    /// Whether the record has at least one stored translation.
    pub fn has_translations(&self) -> bool {
        self.translations.as_ref().is_some_and(|t| !t.is_empty())
    }
}
