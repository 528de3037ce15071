//! Minimal OpenAI-compatible chat client that asks for JSON object replies.
//!
//! Shared by the content generator and the translator.

use std::time::Duration;

use reqwest::{Client, Response, header};
use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, Result, ServiceKind};

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

// ─────────────────────────────────────────────────────────────────────────────
// Shared Retry Logic
// ─────────────────────────────────────────────────────────────────────────────

/// Execute an async operation with exponential backoff retry.
///
/// Retries only on transient errors. Non-retryable errors are returned
/// immediately.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    initial_backoff: Duration,
    client_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = initial_backoff;
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() || attempt >= max_retries => return Err(e),
            Err(e) => {
                attempt += 1;
                tracing::warn!(
                    client = client_name,
                    attempt,
                    max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    /// Maximum retries for transient errors.
    pub max_retries: u32,
    /// Initial backoff duration for retries.
    pub retry_backoff: Duration,
}

impl ChatConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            model: model.into(),
            temperature: 1.0,
            timeout: Duration::from_secs(120),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Chat completions client returning the raw JSON text of the first choice.
pub struct ChatClient {
    client: Client,
    config: ChatConfig,
    kind: ServiceKind,
}

impl ChatClient {
    /// `kind` names the collaborator in errors and logs.
    pub fn new(config: ChatConfig, kind: ServiceKind) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RemoteError::Config(format!("{kind} API key is empty")));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            kind,
        })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send one system + user exchange and return the reply text.
    pub async fn complete_json(&self, system: Option<&str>, user: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: self.config.temperature,
        };

        tracing::debug!(
            client = %self.kind,
            model = %self.config.model,
            "Sending chat completion request"
        );

        let name = self.kind.to_string();
        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            &name,
            || async {
                let response = self
                    .client
                    .post(self.completions_url())
                    .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| RemoteError::transport(self.kind, e))?;

                self.handle_response(response).await
            },
        )
        .await
    }

    async fn handle_response(&self, response: Response) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::transport(self.kind, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(RemoteError::status(self.kind, status.as_u16(), message));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::decode(self.kind, e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(RemoteError::EmptyResponse(self.kind))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(100), "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(RemoteError::status(ServiceKind::ContentGenerator, 503, "busy"))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let err = with_retry(3, Duration::from_millis(100), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(RemoteError::status(ServiceKind::ContentGenerator, 401, "bad key"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.http_status(), Some(401));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let err = with_retry(2, Duration::from_millis(10), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(RemoteError::status(ServiceKind::Translator, 429, "slow down"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.http_status(), Some(429));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let err = ChatClient::new(ChatConfig::new("", "m"), ServiceKind::Translator).err();
        assert!(matches!(err, Some(RemoteError::Config(_))));
    }
}
