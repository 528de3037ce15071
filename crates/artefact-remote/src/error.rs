//! Error types for remote collaborators.

use std::fmt;

use thiserror::Error;

/// Result type alias using the remote error type.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Which external collaborator a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    TaskService,
    ContentGenerator,
    Translator,
    SourceSearch,
    AssetFetch,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceKind::TaskService => "task service",
            ServiceKind::ContentGenerator => "content generator",
            ServiceKind::Translator => "translator",
            ServiceKind::SourceSearch => "source search",
            ServiceKind::AssetFetch => "asset fetch",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    /// Non-2xx response, transport failure, or an unparsable body.
    /// `status` is `None` when no HTTP response was received or decoded.
    #[error("{kind} error{}: {message}", status_suffix(.status))]
    Service {
        kind: ServiceKind,
        status: Option<u16>,
        message: String,
    },

    #[error("{0} returned an empty response")]
    EmptyResponse(ServiceKind),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl RemoteError {
    pub fn status(kind: ServiceKind, status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            kind,
            status: Some(status),
            message: message.into(),
        }
    }

    /// Wrap a transport failure.
    pub fn transport(kind: ServiceKind, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Request timed out: {err}")
        } else if err.is_connect() {
            format!("Connection failed: {err}")
        } else {
            err.to_string()
        };
        Self::Service {
            kind,
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }

    /// Wrap a body that could not be parsed.
    pub fn decode(kind: ServiceKind, err: serde_json::Error) -> Self {
        Self::Service {
            kind,
            status: None,
            message: format!("unparsable response: {err}"),
        }
    }

    pub fn kind(&self) -> Option<ServiceKind> {
        match self {
            Self::Service { kind, .. } | Self::EmptyResponse(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => *status,
            _ => None,
        }
    }

    /// Transient failures worth retrying: no response, rate limiting, or a server error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Service { status: None, message, .. } => !message.starts_with("unparsable"),
            Self::Service {
                status: Some(status),
                ..
            } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(RemoteError::status(ServiceKind::ContentGenerator, 429, "slow down").is_retryable());
        assert!(RemoteError::status(ServiceKind::ContentGenerator, 503, "down").is_retryable());
        assert!(!RemoteError::status(ServiceKind::ContentGenerator, 401, "bad key").is_retryable());
        assert!(!RemoteError::EmptyResponse(ServiceKind::Translator).is_retryable());
        assert!(!RemoteError::Config("x".into()).is_retryable());

        let decode = serde_json::from_str::<u8>("nope").unwrap_err();
        assert!(!RemoteError::decode(ServiceKind::TaskService, decode).is_retryable());
    }

    #[test]
    fn test_display_includes_status() {
        let err = RemoteError::status(ServiceKind::TaskService, 402, "insufficient credit");
        assert_eq!(
            err.to_string(),
            "task service error (HTTP 402): insufficient credit"
        );
        assert_eq!(err.http_status(), Some(402));
        assert_eq!(err.kind(), Some(ServiceKind::TaskService));
    }
}
