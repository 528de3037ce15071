//! Configuration system for the daily artefact generator.
//!
//! Provides TOML-based configuration with:
//! - One section per collaborator (`[tasks]`, `[content]`, `[translation]`, `[search]`)
//! - Poll budgets for the two remote stages (`[poll.image]`, `[poll.model]`)
//! - Config file layering (XDG user config + project-local overrides)
//! - API key resolution (env var → config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_with_options, save_config, xdg_config_dir,
    xdg_config_path, ConfigSource, Layer, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use secrets::{require_api_key, resolve_api_key, ResolvedSecret, SecretSource, Service};
pub use types::*;
