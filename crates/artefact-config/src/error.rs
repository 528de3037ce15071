//! Configuration errors.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No env var and no `api_key` in the config section.
    #[error("API key not found for {service}. Set {env_var} or add api_key to the [{section}] section")]
    ApiKeyNotFound {
        service: String,
        env_var: String,
        section: String,
    },

    /// A value is present but unusable.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// No data directory could be determined for this platform.
    #[error("could not determine a data directory; set [store] database and assets_dir explicitly")]
    NoDataDir,
}
