//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [store]                  # database and asset locations
//! [tasks]                  # remote image / image-to-model task service
//! [poll.image]             # image stage poll budget
//! [poll.model]             # model stage poll budget
//! [content]                # content generation (OpenAI-compatible)
//! [translation]            # translation of the textual fields
//! [search]                 # source news search
//! [cache]                  # read cache expiry per key class
//! [schedule]               # daily run time (UTC)
//! [logging]                # log file settings
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Application name for platform directory resolution.
pub const APP_NAME: &str = "artefact";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged. A section present in a later layer
/// replaces the earlier one wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtefactConfig {
    /// Storage locations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Remote task service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<TasksConfig>,

    /// Poll budgets for both remote stages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollConfig>,

    /// Content generation service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentConfig>,

    /// Translation service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<TranslationConfig>,

    /// Source news search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,

    /// Read cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSection>,

    /// Daily schedule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleConfig>,

    /// Log output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl ArtefactConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: ArtefactConfig) {
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.tasks.is_some() {
            self.tasks = other.tasks;
        }
        if other.poll.is_some() {
            self.poll = other.poll;
        }
        if other.content.is_some() {
            self.content = other.content;
        }
        if other.translation.is_some() {
            self.translation = other.translation;
        }
        if other.search.is_some() {
            self.search = other.search;
        }
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.schedule.is_some() {
            self.schedule = other.schedule;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    pub fn store_or_default(&self) -> StoreConfig {
        self.store.clone().unwrap_or_default()
    }

    pub fn tasks_or_default(&self) -> TasksConfig {
        self.tasks.clone().unwrap_or_default()
    }

    pub fn poll_or_default(&self) -> PollConfig {
        self.poll.clone().unwrap_or_default()
    }

    pub fn content_or_default(&self) -> ContentConfig {
        self.content.clone().unwrap_or_default()
    }

    pub fn translation_or_default(&self) -> TranslationConfig {
        self.translation.clone().unwrap_or_default()
    }

    pub fn search_or_default(&self) -> SearchConfig {
        self.search.clone().unwrap_or_default()
    }

    pub fn cache_or_default(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    pub fn schedule_or_default(&self) -> ScheduleConfig {
        self.schedule.clone().unwrap_or_default()
    }

    pub fn logging_or_default(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Names of sections that carry a plaintext `api_key`.
    pub fn plaintext_key_sections(&self) -> Vec<&'static str> {
        let mut sections = Vec::new();
        if self.tasks.as_ref().is_some_and(|t| t.api_key.is_some()) {
            sections.push("tasks");
        }
        if self.content.as_ref().is_some_and(|c| c.api_key.is_some()) {
            sections.push("content");
        }
        if self
            .translation
            .as_ref()
            .is_some_and(|t| t.api_key.is_some())
        {
            sections.push("translation");
        }
        if self.search.as_ref().is_some_and(|s| s.api_key.is_some()) {
            sections.push("search");
        }
        sections
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref schedule) = self.schedule {
            schedule.validate()?;
        }
        if let Some(ref poll) = self.poll {
            poll.image.validate("poll.image")?;
            poll.model.validate("poll.model")?;
        }
        Ok(())
    }
}

/// Platform data directory for artefact state (`~/.local/share/artefact` on Linux).
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Store Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Storage locations.
///
/// Relative paths are resolved from the data directory.
///
/// ```toml
/// [store]
/// database = "artefact.db"
/// assets_dir = "assets"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database.
    pub database: Option<PathBuf>,
    /// Root directory of the asset store.
    pub assets_dir: Option<PathBuf>,
}

/// Store paths after resolution against a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub database: PathBuf,
    pub assets_dir: PathBuf,
}

impl StoreConfig {
    /// Resolve database and asset paths against `data_dir`.
    pub fn resolve(&self, data_dir: &Path) -> StorePaths {
        let resolve = |p: &Option<PathBuf>, default: &str| match p {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => data_dir.join(p),
            None => data_dir.join(default),
        };
        StorePaths {
            database: resolve(&self.database, "artefact.db"),
            assets_dir: resolve(&self.assets_dir, "assets"),
        }
    }

    /// Resolve against the platform data directory.
    pub fn resolve_default(&self) -> Result<StorePaths> {
        let data_dir = default_data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(self.resolve(&data_dir))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote Task Service Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Remote image / image-to-model task service.
///
/// ```toml
/// [tasks]
/// base_url = "https://api.tripo3d.ai/v2/openapi"
/// timeout_secs = 60
/// image_model_version = "gemini_2.5_flash_image_preview"
/// model_version = "v3.0-20250812"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    pub base_url: String,
    /// Plaintext key. Prefer `TRIPO_API_KEY`.
    pub api_key: Option<String>,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    /// Model used for image tasks.
    pub image_model_version: String,
    /// Model used for image-to-model tasks.
    pub model_version: String,
    /// Face budget for generated meshes.
    pub face_limit: u32,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tripo3d.ai/v2/openapi".to_string(),
            api_key: None,
            timeout_secs: 60,
            image_model_version: "gemini_2.5_flash_image_preview".to_string(),
            model_version: "v3.0-20250812".to_string(),
            face_limit: 9000,
        }
    }
}

impl TasksConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Poll Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Poll budgets for both remote stages.
///
/// ```toml
/// [poll.image]
/// interval_secs = 5
/// max_attempts = 20
///
/// [poll.model]
/// interval_secs = 30
/// max_attempts = 40
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub image: PollPolicyConfig,
    pub model: PollPolicyConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            image: PollPolicyConfig::image(),
            model: PollPolicyConfig::model(),
        }
    }
}

/// Fixed-interval poll budget for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicyConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl PollPolicyConfig {
    /// Image generation is typically fast.
    pub fn image() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: 20,
        }
    }

    /// Model generation is typically slow.
    pub fn model() -> Self {
        Self {
            interval_secs: 30,
            max_attempts: 40,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: format!("{field}.max_attempts"),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content Generation Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Content generation through an OpenAI-compatible chat endpoint.
///
/// ```toml
/// [content]
/// base_url = "https://api.openai.com/v1"
/// model = "gemini-3-pro-preview"
/// temperature = 1.0
/// history_window = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub base_url: String,
    /// Plaintext key. Prefer `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Number of earlier records passed as the recent-history exclusion list.
    pub history_window: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gemini-3-pro-preview".to_string(),
            temperature: 1.0,
            timeout_secs: 120,
            history_window: 10,
        }
    }
}

impl ContentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Translation Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Translation of the four textual fields.
///
/// `base_url` and `api_key` fall back to the `[content]` values when unset.
///
/// ```toml
/// [translation]
/// enabled = true
/// model = "gpt-5-mini"
/// languages = ["en", "ja", "ko", "es", "ru", "pt"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub languages: Vec<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
            model: "gpt-5-mini".to_string(),
            temperature: 0.3,
            languages: artefact_types::TARGET_LANGUAGES
                .iter()
                .map(|l| l.to_string())
                .collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Search Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Source news search.
///
/// ```toml
/// [search]
/// max_results = 15
/// days = 3
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    /// Plaintext key. Prefer `TAVILY_API_KEY`.
    pub api_key: Option<String>,
    pub max_results: u32,
    /// Look-back window the search service applies, in days.
    pub days: u32,
    pub exclude_domains: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com/search".to_string(),
            api_key: None,
            max_results: 15,
            days: 3,
            exclude_domains: [
                "weather.com",
                "espn.com",
                "bleacherreport.com",
                "investing.com",
                "bloomberg.com",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Read cache expiry per key class.
///
/// ```toml
/// [cache]
/// latest_ttl_secs = 3600
/// record_ttl_secs = 86400
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub enabled: bool,
    pub latest_ttl_secs: u64,
    pub record_ttl_secs: u64,
    pub dates_ttl_secs: u64,
    pub neighbour_ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            latest_ttl_secs: 60 * 60,
            record_ttl_secs: 24 * 60 * 60,
            dates_ttl_secs: 60 * 60,
            neighbour_ttl_secs: 24 * 60 * 60,
            max_entries: 4096,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schedule Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Time of the daily run, in UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { hour: 0, minute: 5 }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hour > 23 {
            return Err(ConfigError::InvalidValue {
                field: "schedule.hour".to_string(),
                message: format!("{} is not in 0..=23", self.hour),
            });
        }
        if self.minute > 59 {
            return Err(ConfigError::InvalidValue {
                field: "schedule.minute".to_string(),
                message: format!("{} is not in 0..=59", self.minute),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Log file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write JSON logs to a daily-rolling file.
    pub file: bool,
    /// Log directory. Defaults to `<data_dir>/logs`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: true,
            directory: None,
        }
    }
}

impl LoggingConfig {
    pub fn resolve_directory(&self) -> Option<PathBuf> {
        self.directory
            .clone()
            .or_else(|| default_data_dir().map(|d| d.join("logs")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ArtefactConfig::from_toml("").unwrap();
        assert!(config.store.is_none());

        let poll = config.poll_or_default();
        assert_eq!(poll.image, PollPolicyConfig::image());
        assert_eq!(poll.model.interval_secs, 30);
        assert_eq!(poll.model.max_attempts, 40);

        let translation = config.translation_or_default();
        assert_eq!(translation.languages, vec!["en", "ja", "ko", "es", "ru", "pt"]);
    }

    #[test]
    fn test_parse_full_config() {
        let config = ArtefactConfig::from_toml(
            r#"
[store]
database = "/var/lib/artefact/db.sqlite"

[tasks]
timeout_secs = 10

[poll.image]
interval_secs = 1
max_attempts = 3

[content]
model = "gpt-4o"
history_window = 5

[translation]
enabled = false

[schedule]
hour = 6
minute = 30
"#,
        )
        .unwrap();

        assert_eq!(config.tasks_or_default().timeout_secs, 10);
        let poll = config.poll_or_default();
        assert_eq!(poll.image.max_attempts, 3);
        // Unspecified stage keeps its own default.
        assert_eq!(poll.model, PollPolicyConfig::model());
        assert_eq!(config.content_or_default().history_window, 5);
        assert!(!config.translation_or_default().enabled);
        assert_eq!(config.schedule_or_default().hour, 6);
        config.validate().unwrap();
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = ArtefactConfig::from_toml("[content]\nmodel = \"a\"\n[search]\ndays = 1").unwrap();
        let overlay = ArtefactConfig::from_toml("[content]\nmodel = \"b\"").unwrap();
        base.merge(overlay);

        assert_eq!(base.content_or_default().model, "b");
        assert_eq!(base.search_or_default().days, 1);
    }

    #[test]
    fn test_store_paths_resolve_relative_to_data_dir() {
        let store = StoreConfig {
            database: Some(PathBuf::from("custom.db")),
            assets_dir: Some(PathBuf::from("/abs/assets")),
        };
        let paths = store.resolve(Path::new("/data"));
        assert_eq!(paths.database, PathBuf::from("/data/custom.db"));
        assert_eq!(paths.assets_dir, PathBuf::from("/abs/assets"));

        let paths = StoreConfig::default().resolve(Path::new("/data"));
        assert_eq!(paths.database, PathBuf::from("/data/artefact.db"));
        assert_eq!(paths.assets_dir, PathBuf::from("/data/assets"));
    }

    #[test]
    fn test_validate_rejects_bad_schedule() {
        let config = ArtefactConfig::from_toml("[schedule]\nhour = 24").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "schedule.hour"));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config =
            ArtefactConfig::from_toml("[poll.model]\ninterval_secs = 1\nmax_attempts = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_plaintext_key_sections() {
        let config = ArtefactConfig::from_toml(
            "[tasks]\napi_key = \"tsk\"\n[search]\napi_key = \"tvly\"",
        )
        .unwrap();
        assert_eq!(config.plaintext_key_sections(), vec!["tasks", "search"]);
    }

    #[test]
    fn test_toml_round_trip_keeps_sections() {
        let config = ArtefactConfig::from_toml("[cache]\nmax_entries = 10").unwrap();
        let text = config.to_toml().unwrap();
        let back = ArtefactConfig::from_toml(&text).unwrap();
        assert_eq!(back.cache_or_default().max_entries, 10);
        assert!(back.tasks.is_none());
    }
}
