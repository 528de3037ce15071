//! Remote task service abstraction.
//!
//! A task service accepts a generation request, hands back an opaque task
//! identifier, and reports progress when polled. Retry policy is not the
//! client's concern; every call is attempted exactly once.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The two kinds of remote task in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Text prompt to image.
    Image,
    /// Image to 3D model.
    ImageToModel,
}

impl TaskKind {
    /// Name of the output field that must be present on success.
    pub fn result_field(&self) -> &'static str {
        match self {
            TaskKind::Image => "generated_image",
            TaskKind::ImageToModel => "pbr_model|model",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Image => f.write_str("image"),
            TaskKind::ImageToModel => f.write_str("model"),
        }
    }
}

/// Parameters for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRequest {
    Image { prompt: String },
    ImageToModel { image_url: String },
}

impl TaskRequest {
    pub fn image(prompt: impl Into<String>) -> Self {
        Self::Image {
            prompt: prompt.into(),
        }
    }

    pub fn image_to_model(image_url: impl Into<String>) -> Self {
        Self::ImageToModel {
            image_url: image_url.into(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::Image { .. } => TaskKind::Image,
            TaskRequest::ImageToModel { .. } => TaskKind::ImageToModel,
        }
    }
}

/// Coarse task state as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Failed,
}

impl TaskState {
    /// Map a service status string. Cancelled, banned and expired tasks will
    /// never produce output and count as failed; unrecognised states are
    /// treated as still running.
    pub fn from_service(status: &str) -> Self {
        match status {
            "queued" => TaskState::Queued,
            "running" => TaskState::Running,
            "success" => TaskState::Success,
            "failed" | "cancelled" | "banned" | "expired" => TaskState::Failed,
            _ => TaskState::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Queued => "queued",
            TaskState::Running => "running",
            TaskState::Success => "success",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Output references a task may expose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_model: Option<String>,
}

/// One poll result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: TaskState,
    pub output: TaskOutput,
    pub progress: Option<u8>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            output: TaskOutput::default(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_output(mut self, output: TaskOutput) -> Self {
        self.output = output;
        self
    }

    /// The result reference expected for `kind`, ignoring empty strings.
    ///
    /// Image tasks deliver `generated_image`; model tasks prefer the PBR mesh
    /// and fall back to the base mesh.
    pub fn result_ref(&self, kind: TaskKind) -> Option<&str> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        match kind {
            TaskKind::Image => non_empty(&self.output.generated_image),
            TaskKind::ImageToModel => {
                non_empty(&self.output.pbr_model).or_else(|| non_empty(&self.output.model))
            }
        }
    }
}

/// A remote service that runs long generation tasks.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Create a task and return its identifier.
    async fn create_task(&self, request: &TaskRequest) -> Result<String>;

    /// Fetch the current status of a task once.
    async fn poll_once(&self, task_id: &str) -> Result<TaskStatus>;

    /// Service name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping() {
        assert_eq!(TaskState::from_service("queued"), TaskState::Queued);
        assert_eq!(TaskState::from_service("success"), TaskState::Success);
        assert_eq!(TaskState::from_service("cancelled"), TaskState::Failed);
        assert_eq!(TaskState::from_service("unknown"), TaskState::Running);
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Queued.is_terminal());
    }

    #[test]
    fn test_model_result_prefers_pbr() {
        let status = TaskStatus::new(TaskState::Success).with_output(TaskOutput {
            generated_image: None,
            model: Some("https://cdn/base.glb".into()),
            pbr_model: Some("https://cdn/pbr.glb".into()),
        });
        assert_eq!(status.result_ref(TaskKind::ImageToModel), Some("https://cdn/pbr.glb"));
        assert_eq!(status.result_ref(TaskKind::Image), None);

        let status = TaskStatus::new(TaskState::Success).with_output(TaskOutput {
            pbr_model: Some(String::new()),
            model: Some("https://cdn/base.glb".into()),
            ..Default::default()
        });
        assert_eq!(status.result_ref(TaskKind::ImageToModel), Some("https://cdn/base.glb"));
    }

    #[test]
    fn test_request_kind() {
        assert_eq!(TaskRequest::image("a duck").kind(), TaskKind::Image);
        assert_eq!(
            TaskRequest::image_to_model("https://x/y.png").kind(),
            TaskKind::ImageToModel
        );
        assert_eq!(TaskKind::ImageToModel.to_string(), "model");
    }
}
