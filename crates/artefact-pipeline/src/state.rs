//! The pipeline checkpoint embedded on an artefact record.
//!
//! Stored as a small JSON document:
//!
//! ```text
//! {"stage":"image","imageTaskId":"…","imageUrl":"…"}            (imageUrl optional)
//! {"stage":"model","imageTaskId":"…","imageUrl":"…","modelTaskId":"…"}
//! ```
//!
//! Older records hold a bare model task id instead; any blob that does not
//! parse as the document above is read that way, so decoding never fails.

use serde::{Deserialize, Serialize};

/// Which remote task the pipeline is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Image,
    Model,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Image => f.write_str("image"),
            Stage::Model => f.write_str("model"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Image task created; `image_url` is set once it resolved.
    Image {
        task_id: String,
        image_url: Option<String>,
    },
    /// Model task created from a resolved image.
    Model {
        image_task_id: String,
        image_url: String,
        model_task_id: String,
    },
    /// Single-stage checkpoint: a bare model task id with no image URL.
    Legacy { task_id: String },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase", rename_all_fields = "camelCase")]
enum Document {
    Image {
        image_task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
    Model {
        image_task_id: String,
        image_url: String,
        model_task_id: String,
    },
}

impl PipelineState {
    pub fn image(task_id: impl Into<String>) -> Self {
        Self::Image {
            task_id: task_id.into(),
            image_url: None,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Image { .. } => Stage::Image,
            Self::Model { .. } | Self::Legacy { .. } => Stage::Model,
        }
    }

    /// The resolved image URL, if known.
    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Image { image_url, .. } => image_url.as_deref(),
            Self::Model { image_url, .. } => Some(image_url),
            Self::Legacy { .. } => None,
        }
    }

    /// The task currently being waited on.
    pub fn active_task_id(&self) -> &str {
        match self {
            Self::Image { task_id, .. } | Self::Legacy { task_id } => task_id,
            Self::Model { model_task_id, .. } => model_task_id,
        }
    }

    pub fn encode(&self) -> String {
        let doc = match self {
            Self::Legacy { task_id } => return task_id.clone(),
            Self::Image { task_id, image_url } => Document::Image {
                image_task_id: task_id.clone(),
                image_url: image_url.clone(),
            },
            Self::Model {
                image_task_id,
                image_url,
                model_task_id,
            } => Document::Model {
                image_task_id: image_task_id.clone(),
                image_url: image_url.clone(),
                model_task_id: model_task_id.clone(),
            },
        };
        // A struct of strings always serializes.
        serde_json::to_string(&doc).unwrap_or_default()
    }

    pub fn decode(blob: &str) -> Self {
        match serde_json::from_str::<Document>(blob) {
            Ok(Document::Image {
                image_task_id,
                image_url,
            }) => Self::Image {
                task_id: image_task_id,
                image_url: image_url.filter(|u| !u.is_empty()),
            },
            Ok(Document::Model {
                image_task_id,
                image_url,
                model_task_id,
            }) => Self::Model {
                image_task_id,
                image_url,
                model_task_id,
            },
            Err(_) => Self::Legacy {
                task_id: blob.trim().to_string(),
            },
        }
    }

    /// Decode a record's stored blob; blank means no checkpoint.
    pub fn from_record_blob(blob: Option<&str>) -> Option<Self> {
        blob.filter(|b| !b.trim().is_empty()).map(Self::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_stage_document() {
        let state = PipelineState::image("img-1");
        assert_eq!(state.encode(), r#"{"stage":"image","imageTaskId":"img-1"}"#);

        let resolved = PipelineState::Image {
            task_id: "img-1".into(),
            image_url: Some("https://cdn/i.png".into()),
        };
        let blob = resolved.encode();
        assert!(blob.contains(r#""imageUrl":"https://cdn/i.png""#));
        assert_eq!(PipelineState::decode(&blob), resolved);
    }

    #[test]
    fn test_model_stage_document() {
        let blob = r#"{"stage":"model","imageTaskId":"img-1","imageUrl":"https://cdn/i.png","modelTaskId":"mdl-2"}"#;
        let state = PipelineState::decode(blob);
        assert_eq!(state.stage(), Stage::Model);
        assert_eq!(state.active_task_id(), "mdl-2");
        assert_eq!(state.image_url(), Some("https://cdn/i.png"));
        assert_eq!(state.encode(), blob);
    }

    #[test]
    fn test_bare_task_id_is_legacy_model_stage() {
        let state = PipelineState::decode("task-abc123");
        assert_eq!(
            state,
            PipelineState::Legacy {
                task_id: "task-abc123".into()
            }
        );
        assert_eq!(state.stage(), Stage::Model);
        assert_eq!(state.image_url(), None);
        assert_eq!(state.encode(), "task-abc123");
    }

    #[test]
    fn test_incomplete_document_falls_back_to_legacy() {
        let state = PipelineState::decode(r#"{"stage":"model"}"#);
        assert!(matches!(state, PipelineState::Legacy { .. }));
    }

    #[test]
    fn test_blank_blob_is_no_checkpoint() {
        assert_eq!(PipelineState::from_record_blob(None), None);
        assert_eq!(PipelineState::from_record_blob(Some("  ")), None);
        assert!(PipelineState::from_record_blob(Some("t-1")).is_some());
    }
}
