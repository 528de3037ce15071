//! Wiring of configuration into the store, cache and orchestrator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use artefact_cache::{ArtefactCache, CacheConfig};
use artefact_config::{ArtefactConfig, CacheSection, Service, StorePaths, require_api_key};
use artefact_pipeline::{Collaborators, Orchestrator, OrchestratorConfig, RetryPolicy};
use artefact_remote::{
    ChatConfig, HttpAssetFetcher, OpenAiContentGenerator, OpenAiTranslator, TavilyConfig,
    TavilySearch, Translator, TripoClient, TripoConfig,
};
use artefact_store::{ArtefactRepository, ArtefactStore, FsAssetStore};
use tokio_util::sync::CancellationToken;

/// Upper bound for downloading a finished model.
const ASSET_FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Opened storage plus the configuration it came from.
pub struct App {
    pub repo: Arc<ArtefactRepository>,
    pub paths: StorePaths,
}

impl App {
    /// Open the database (creating it if needed) and the read cache.
    pub fn open(config: &ArtefactConfig) -> Result<Self> {
        let paths = config.store_or_default().resolve_default()?;
        if let Some(parent) = paths.database.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let store = Arc::new(ArtefactStore::open(&paths.database)?);
        let cache = Arc::new(ArtefactCache::new(cache_config(&config.cache_or_default())));
        tracing::debug!(database = %paths.database.display(), "Store opened");

        Ok(Self {
            repo: Arc::new(ArtefactRepository::new(store, cache)),
            paths,
        })
    }

    /// Build an orchestrator with real remote clients. Requires API keys.
    pub fn orchestrator(
        &self,
        config: &ArtefactConfig,
        cancel: CancellationToken,
    ) -> Result<Orchestrator> {
        let collaborators = collaborators(config, &self.paths)?;
        Ok(Orchestrator::new(self.repo.clone(), collaborators)
            .with_config(orchestrator_config(config))
            .with_cancellation(cancel))
    }
}

/// A token cancelled on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, the record stays resumable");
            trigger.cancel();
        }
    });
    token
}

pub fn cache_config(section: &CacheSection) -> CacheConfig {
    let config = CacheConfig::new()
        .with_latest_ttl(Duration::from_secs(section.latest_ttl_secs))
        .with_record_ttl(Duration::from_secs(section.record_ttl_secs))
        .with_dates_ttl(Duration::from_secs(section.dates_ttl_secs))
        .with_neighbour_ttl(Duration::from_secs(section.neighbour_ttl_secs))
        .with_max_entries(section.max_entries);
    if section.enabled {
        config
    } else {
        config.disabled()
    }
}

pub fn orchestrator_config(config: &ArtefactConfig) -> OrchestratorConfig {
    let poll = config.poll_or_default();
    OrchestratorConfig {
        image_policy: RetryPolicy::new(poll.image.interval(), poll.image.max_attempts),
        model_policy: RetryPolicy::new(poll.model.interval(), poll.model.max_attempts),
        history_window: config.content_or_default().history_window,
    }
}

fn collaborators(config: &ArtefactConfig, paths: &StorePaths) -> Result<Collaborators> {
    let tasks = config.tasks_or_default();
    let tasks_key = require_api_key(Service::Tasks, tasks.api_key.as_deref())?;
    let task_service = TripoClient::new(
        TripoConfig::new(tasks_key.value)
            .with_base_url(&tasks.base_url)
            .with_timeout(tasks.timeout())
            .with_image_model_version(&tasks.image_model_version)
            .with_model_version(&tasks.model_version)
            .with_face_limit(tasks.face_limit),
    )?;

    let content = config.content_or_default();
    let content_key = require_api_key(Service::Content, content.api_key.as_deref())?;
    let generator = OpenAiContentGenerator::new(
        ChatConfig::new(content_key.value.clone(), &content.model)
            .with_base_url(&content.base_url)
            .with_temperature(content.temperature)
            .with_timeout(content.timeout()),
    )?;

    let search = config.search_or_default();
    let search_key = require_api_key(Service::Search, search.api_key.as_deref())?;
    let source_search = TavilySearch::new(
        TavilyConfig::new(search_key.value)
            .with_url(&search.base_url)
            .with_max_results(search.max_results)
            .with_days(search.days)
            .with_exclude_domains(search.exclude_domains.clone()),
    )?;

    let translation = config.translation_or_default();
    let translator: Option<Arc<dyn Translator>> = if translation.enabled {
        let api_key = translation
            .api_key
            .clone()
            .unwrap_or_else(|| content_key.value.clone());
        let base_url = translation
            .base_url
            .clone()
            .unwrap_or_else(|| content.base_url.clone());
        let chat = ChatConfig::new(api_key, &translation.model)
            .with_base_url(base_url)
            .with_temperature(translation.temperature);
        Some(Arc::new(OpenAiTranslator::new(
            chat,
            translation.languages.clone(),
        )?))
    } else {
        None
    };

    Ok(Collaborators {
        tasks: Arc::new(task_service),
        content: Arc::new(generator),
        search: Arc::new(source_search),
        translator,
        fetcher: Arc::new(HttpAssetFetcher::new(ASSET_FETCH_TIMEOUT)?),
        assets: Arc::new(FsAssetStore::new(paths.assets_dir.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_config_from_file() {
        let config = ArtefactConfig::from_toml(
            r#"
            [poll.model]
            interval_secs = 10
            max_attempts = 90
            "#,
        )
        .unwrap();
        let orchestrator = orchestrator_config(&config);
        assert_eq!(orchestrator.model_policy, RetryPolicy::new(Duration::from_secs(10), 90));
        assert_eq!(orchestrator.image_policy, RetryPolicy::IMAGE);
        assert_eq!(orchestrator.history_window, 10);
    }

    #[test]
    fn test_disabled_cache() {
        let section = CacheSection {
            enabled: false,
            ..Default::default()
        };
        assert!(!cache_config(&section).enabled);
    }
}
