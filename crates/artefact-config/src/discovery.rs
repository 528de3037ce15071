//! Locating config files and folding them into one [`ArtefactConfig`].
//!
//! Two layers are read, the later one replacing whole sections of the first:
//! the user file `<config dir>/config.toml`, then `artefact.toml` in the
//! working (or given project) directory. A layer that is missing is skipped;
//! one that cannot be parsed is skipped with a warning.

use std::path::{Path, PathBuf};

use crate::types::APP_NAME;
use crate::{ArtefactConfig, ConfigError, Result};

const PROJECT_CONFIG_FILE: &str = "artefact.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "ARTEFACT_CONFIG_DIR";

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    User,
    Project,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::User => f.pad("user"),
            Layer::Project => f.pad("project"),
        }
    }
}

/// One candidate config file and whether it contributed.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: Layer,
    pub path: PathBuf,
    pub loaded: bool,
}

/// The merged configuration plus how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ArtefactConfig,
    /// Every candidate, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|s| s.loaded.then_some(s.path.as_path()))
            .collect()
    }
}

pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with `config_dir` taking precedence over
/// `ARTEFACT_CONFIG_DIR` and the platform directory.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut candidates = Vec::with_capacity(2);
    if let Some(path) = config_dir
        .map(|d| d.join(USER_CONFIG_FILE))
        .or_else(xdg_config_path)
    {
        candidates.push((Layer::User, path));
    }
    candidates.push((
        Layer::Project,
        project_dir.map_or_else(
            || PathBuf::from(PROJECT_CONFIG_FILE),
            |d| d.join(PROJECT_CONFIG_FILE),
        ),
    ));

    let mut config = ArtefactConfig::new();
    let mut warnings = Vec::new();
    let sources: Vec<ConfigSource> = candidates
        .into_iter()
        .map(|(layer, path)| {
            let loaded = match read_layer(&path) {
                Ok(Some(overlay)) => {
                    config.merge(overlay);
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    warnings.push(format!("Failed to load {layer} config: {e}"));
                    false
                }
            };
            ConfigSource {
                layer,
                path,
                loaded,
            }
        })
        .collect();

    warnings.extend(config.plaintext_key_sections().into_iter().map(|section| {
        format!("[{section}] contains a plaintext API key; prefer the environment variable")
    }));
    config.validate()?;

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

fn read_layer(path: &Path) -> Result<Option<ArtefactConfig>> {
    if path.is_file() {
        load_config_file(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Read and parse one file, without discovery.
pub fn load_config_file(path: &Path) -> Result<ArtefactConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    ArtefactConfig::from_toml(&text)
}

/// Write `config` as TOML, creating missing parent directories.
pub fn save_config(config: &ArtefactConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFile {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|source| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// `ARTEFACT_CONFIG_DIR` when set and non-empty, else `<platform config>/artefact`.
pub fn xdg_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join(APP_NAME)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
