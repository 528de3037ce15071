//! Tripo-compatible task service client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{RemoteError, Result, ServiceKind};
use crate::task::{TaskOutput, TaskRequest, TaskService, TaskState, TaskStatus};

/// Default API base URL.
pub const DEFAULT_TRIPO_BASE: &str = "https://api.tripo3d.ai/v2/openapi";

const KIND: ServiceKind = ServiceKind::TaskService;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TripoConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Model used for text-to-image tasks.
    pub image_model_version: String,
    /// Model used for image-to-model tasks.
    pub model_version: String,
    pub face_limit: u32,
}

impl TripoConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_TRIPO_BASE.to_string(),
            timeout: Duration::from_secs(60),
            image_model_version: "gemini_2.5_flash_image_preview".to_string(),
            model_version: "v3.0-20250812".to_string(),
            face_limit: 9000,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_image_model_version(mut self, version: impl Into<String>) -> Self {
        self.image_model_version = version.into();
        self
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = version.into();
        self
    }

    pub fn with_face_limit(mut self, limit: u32) -> Self {
        self.face_limit = limit;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedTask {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct PolledTask {
    status: String,
    #[serde(default)]
    output: Option<TaskOutput>,
    #[serde(default)]
    progress: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for the task service. Never retries.
pub struct TripoClient {
    client: Client,
    config: TripoConfig,
}

impl TripoClient {
    pub fn new(config: TripoConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RemoteError::Config("task service API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn task_url(&self) -> String {
        format!("{}/task", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &TaskRequest) -> Value {
        match request {
            TaskRequest::Image { prompt } => json!({
                "type": "generate_image",
                "model_version": self.config.image_model_version,
                "prompt": prompt,
            }),
            TaskRequest::ImageToModel { image_url } => json!({
                "type": "image_to_model",
                "file": { "type": "png", "url": image_url },
                "model_version": self.config.model_version,
                "texture": true,
                "pbr": true,
                "texture_quality": "detailed",
                "geometry_quality": "detailed",
                "orientation": "align_image",
                "face_limit": self.config.face_limit,
                "enable_image_autofix": true,
            }),
        }
    }

    /// Decode a response envelope, mapping every non-success shape to a service error.
    async fn handle_response<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::transport(KIND, e))?;

        if !status.is_success() {
            return Err(RemoteError::status(KIND, status.as_u16(), body));
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| RemoteError::decode(KIND, e))?;
        if envelope.code != 0 {
            return Err(RemoteError::status(
                KIND,
                status.as_u16(),
                format!(
                    "service code {}: {}",
                    envelope.code,
                    envelope.message.unwrap_or_default()
                ),
            ));
        }
        envelope.data.ok_or(RemoteError::EmptyResponse(KIND))
    }
}

#[async_trait]
impl TaskService for TripoClient {
    async fn create_task(&self, request: &TaskRequest) -> Result<String> {
        let body = self.request_body(request);
        tracing::debug!(kind = %request.kind(), "Creating remote task");

        let response = self
            .client
            .post(self.task_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::transport(KIND, e))?;

        let created: CreatedTask = Self::handle_response(response).await?;
        if created.task_id.is_empty() {
            return Err(RemoteError::EmptyResponse(KIND));
        }
        Ok(created.task_id)
    }

    async fn poll_once(&self, task_id: &str) -> Result<TaskStatus> {
        let response = self
            .client
            .get(format!("{}/{}", self.task_url(), task_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .send()
            .await
            .map_err(|e| RemoteError::transport(KIND, e))?;

        let polled: PolledTask = Self::handle_response(response).await?;
        Ok(TaskStatus {
            state: TaskState::from_service(&polled.status),
            output: polled.output.unwrap_or_default(),
            progress: polled.progress.map(|p| p.clamp(0.0, 100.0) as u8),
        })
    }

    fn name(&self) -> &str {
        "tripo"
    }
}
