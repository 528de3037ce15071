//! Error types for shared domain values.

use thiserror::Error;

/// Result type alias using the types error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing domain values.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid calendar key '{0}': expected YYYY-MM-DD")]
    InvalidKey(String),

    #[error("Invalid artefact status: {0}")]
    InvalidStatus(String),
}
