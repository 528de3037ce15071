//! API key resolution.
//!
//! Resolution order:
//! 1. Environment variable
//! 2. Config file (with warning at load time)

use crate::{ConfigError, Result};

/// External services that need credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Remote image / image-to-model task service.
    Tasks,
    /// Content generation and translation (OpenAI-compatible).
    Content,
    /// Source news search.
    Search,
}

impl Service {
    /// Environment variable consulted for this service's key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Service::Tasks => "TRIPO_API_KEY",
            Service::Content => "OPENAI_API_KEY",
            Service::Search => "TAVILY_API_KEY",
        }
    }

    /// Config section holding the plaintext fallback.
    pub fn section(&self) -> &'static str {
        match self {
            Service::Tasks => "tasks",
            Service::Content => "content",
            Service::Search => "search",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Tasks => write!(f, "task service"),
            Service::Content => write!(f, "content service"),
            Service::Search => write!(f, "search service"),
        }
    }
}

/// Result of API key resolution with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve an API key for a service: environment first, then config.
pub fn resolve_api_key(service: Service, config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_with_env(service, config_value, |var| std::env::var(var).ok())
}

/// Like [`resolve_api_key`] but fails with [`ConfigError::ApiKeyNotFound`].
pub fn require_api_key(service: Service, config_value: Option<&str>) -> Result<ResolvedSecret> {
    resolve_api_key(service, config_value).ok_or_else(|| ConfigError::ApiKeyNotFound {
        service: service.to_string(),
        env_var: service.env_var().to_string(),
        section: service.section().to_string(),
    })
}

fn resolve_with_env(
    service: Service,
    config_value: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<ResolvedSecret> {
    let env_var = service.env_var();
    if let Some(value) = env(env_var).filter(|v| !v.is_empty()) {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}
