//! Resumable orchestration of one calendar key through both remote stages.
//!
//! ```text
//! content ─▶ pending record ─▶ image task ─▶ image url ─▶ model task ─▶ asset ─▶ completed
//!                 │                 │            │             │
//!             checkpoint        checkpoint   checkpoint    checkpoint
//! ```
//!
//! Every remote identifier is written to the record before anything waits on
//! it, so re-entering for the same key continues where the last run stopped
//! instead of creating duplicate remote work.

use std::collections::HashSet;
use std::sync::Arc;

use artefact_remote::{
    AssetFetcher, ContentGenerator, RemoteError, SourceSearch, TaskKind, TaskRequest,
    TaskService, Translator,
};
use artefact_store::{ArtefactRepository, AssetStore};
use artefact_types::{ArtefactRecord, ArtefactStatus, CalendarKey, TranslatableFields, Translations};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::{OrchestrationError, Result};
use crate::poller::{RetryPolicy, wait_for};
use crate::state::PipelineState;

/// Number of earlier picks shown to the content generator.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// The remote collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub tasks: Arc<dyn TaskService>,
    pub content: Arc<dyn ContentGenerator>,
    pub search: Arc<dyn SourceSearch>,
    /// `None` disables translation.
    pub translator: Option<Arc<dyn Translator>>,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub assets: Arc<dyn AssetStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub image_policy: RetryPolicy,
    pub model_policy: RetryPolicy,
    pub history_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            image_policy: RetryPolicy::IMAGE,
            model_policy: RetryPolicy::MODEL,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

/// Poll budget overrides for a resume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeBudget {
    pub image_attempts: Option<u32>,
    pub model_attempts: Option<u32>,
}

impl ResumeBudget {
    fn apply(&self, config: &OrchestratorConfig) -> Policies {
        Policies {
            image: self
                .image_attempts
                .map_or(config.image_policy, |n| config.image_policy.with_max_attempts(n)),
            model: self
                .model_attempts
                .map_or(config.model_policy, |n| config.model_policy.with_max_attempts(n)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Policies {
    image: RetryPolicy,
    model: RetryPolicy,
}

/// Result of translating one key during a backfill.
#[derive(Debug)]
pub struct TranslationOutcome {
    pub key: CalendarKey,
    /// Number of languages stored on success.
    pub result: Result<usize>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Removes the key from the in-flight set when dropped.
struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<CalendarKey>>,
    key: CalendarKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

/// Background translation joined before completion. Aborted if dropped unjoined.
struct TranslationTask {
    handle: Option<JoinHandle<std::result::Result<Translations, RemoteError>>>,
}

impl TranslationTask {
    fn none() -> Self {
        Self { handle: None }
    }

    /// Wait for the translation; failures are logged and yield `None`.
    async fn join(mut self) -> Option<Translations> {
        let handle = self.handle.take()?;
        match handle.await {
            Ok(Ok(translations)) if !translations.is_empty() => Some(translations),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                warn!(error = %e, "Translation failed, continuing without it");
                None
            }
            Err(e) => {
                warn!(error = %e, "Translation task did not finish");
                None
            }
        }
    }
}

impl Drop for TranslationTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator {
    repo: Arc<ArtefactRepository>,
    collaborators: Collaborators,
    config: OrchestratorConfig,
    cancel: CancellationToken,
    in_flight: Mutex<HashSet<CalendarKey>>,
}

impl Orchestrator {
    pub fn new(repo: Arc<ArtefactRepository>, collaborators: Collaborators) -> Self {
        Self {
            repo,
            collaborators,
            config: OrchestratorConfig::default(),
            cancel: CancellationToken::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn repository(&self) -> &ArtefactRepository {
        &self.repo
    }

    /// Token that stops every poll loop of this orchestrator.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Produce the artefact for `key`.
    ///
    /// A completed record is returned without any remote call. A record still
    /// `generating` resumes from its checkpoint. Anything else starts fresh.
    pub async fn generate(&self, key: CalendarKey) -> Result<ArtefactRecord> {
        let span = info_span!("generate", key = %key, run_id = %Uuid::new_v4());
        async {
            let _guard = self.begin(key)?;
            self.generate_inner(key).await
        }
        .instrument(span)
        .await
    }

    /// Delete any record for `key`, then generate it from scratch.
    pub async fn regenerate(&self, key: CalendarKey) -> Result<ArtefactRecord> {
        let span = info_span!("regenerate", key = %key, run_id = %Uuid::new_v4());
        async {
            let _guard = self.begin(key)?;
            if self.repo.delete(key)? {
                info!("Deleted existing record");
            }
            self.generate_inner(key).await
        }
        .instrument(span)
        .await
    }

    /// Continue a `generating` record, or a `failed` one that kept its
    /// checkpoint, with optionally larger poll budgets.
    pub async fn resume(&self, key: CalendarKey, budget: ResumeBudget) -> Result<ArtefactRecord> {
        let span = info_span!("resume", key = %key, run_id = %Uuid::new_v4());
        async {
            let _guard = self.begin(key)?;
            let record = self
                .repo
                .store()
                .get_by_key(key)?
                .ok_or(OrchestrationError::NothingToResume(key))?;
            let state = PipelineState::from_record_blob(record.pipeline_state.as_deref());

            let record = match record.status {
                ArtefactStatus::Completed => {
                    info!("Already completed");
                    return Ok(record);
                }
                ArtefactStatus::Failed if state.is_none() => {
                    return Err(OrchestrationError::NothingToResume(key));
                }
                ArtefactStatus::Failed => {
                    info!("Re-opening failed record");
                    self.repo.store().reopen(key)?
                }
                ArtefactStatus::Generating | ArtefactStatus::Pending => record,
            };

            let policies = budget.apply(&self.config);
            self.guarded(key, self.continue_record(record, state, policies))
                .await
        }
        .instrument(span)
        .await
    }

    /// Translate one record and store the result, whatever its status.
    pub async fn translate(&self, key: CalendarKey) -> Result<ArtefactRecord> {
        let translator = self.translator()?;
        let mut record = self
            .repo
            .store()
            .get_by_key(key)?
            .ok_or(OrchestrationError::NotFound(key))?;

        let translations = translator.translate(&record.translatable()).await?;
        self.repo.set_translations(key, &translations)?;
        info!(key = %key, languages = translations.len(), "Translations stored");
        record.translations = Some(translations);
        Ok(record)
    }

    /// Translate every completed record that has none yet.
    ///
    /// Keeps going past failures and reports each key's outcome.
    pub async fn translate_missing(&self) -> Result<Vec<TranslationOutcome>> {
        self.translator()?;
        let records = self.repo.store().list_missing_translations()?;
        info!(count = records.len(), "Translating records without translations");

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let key = record.key;
            let result = self.translate(key).await.map(|r| {
                r.translations.as_ref().map_or(0, Translations::len)
            });
            if let Err(e) = &result {
                warn!(key = %key, error = %e, "Translation backfill failed");
            }
            outcomes.push(TranslationOutcome { key, result });
        }
        Ok(outcomes)
    }

    // ── Driving ─────────────────────────────────────────────────────

    fn begin(&self, key: CalendarKey) -> Result<FlightGuard<'_>> {
        if !self.in_flight.lock().insert(key) {
            return Err(OrchestrationError::AlreadyRunning(key));
        }
        Ok(FlightGuard {
            in_flight: &self.in_flight,
            key,
        })
    }

    fn translator(&self) -> Result<&Arc<dyn Translator>> {
        self.collaborators.translator.as_ref().ok_or_else(|| {
            RemoteError::Config("translation is disabled".to_string()).into()
        })
    }

    async fn generate_inner(&self, key: CalendarKey) -> Result<ArtefactRecord> {
        let policies = ResumeBudget::default().apply(&self.config);

        if let Some(record) = self.repo.store().get_by_key(key)? {
            match record.status {
                ArtefactStatus::Completed => {
                    info!("Already completed");
                    return Ok(record);
                }
                ArtefactStatus::Generating | ArtefactStatus::Pending => {
                    info!("Found in-flight record, resuming");
                    let state = PipelineState::from_record_blob(record.pipeline_state.as_deref());
                    return self
                        .guarded(key, self.continue_record(record, state, policies))
                        .await;
                }
                ArtefactStatus::Failed => info!("Previous attempt failed, starting over"),
            }
        }

        self.guarded(key, self.fresh(key, policies)).await
    }

    /// Mark the key failed on errors that call for it, then re-raise.
    async fn guarded(
        &self,
        key: CalendarKey,
        run: impl Future<Output = Result<ArtefactRecord>>,
    ) -> Result<ArtefactRecord> {
        match run.await {
            Ok(record) => Ok(record),
            Err(e) => {
                if e.marks_failed() {
                    if let Err(mark) = self.repo.store().fail(key) {
                        error!(error = %mark, "Could not mark artefact failed");
                    }
                    error!(error = %e, "Generation failed");
                } else {
                    warn!(error = %e, "Generation stopped, record left resumable");
                }
                Err(e)
            }
        }
    }

    async fn fresh(&self, key: CalendarKey, policies: Policies) -> Result<ArtefactRecord> {
        let store = self.repo.store();
        let recent = store.list_recent_before(key, self.config.history_window)?;
        let sources = self.collaborators.search.search(key).await?;
        info!(sources = sources.len(), recent = recent.len(), "Generating content");

        let content = self
            .collaborators
            .content
            .generate(key, &sources, &recent)
            .await?;
        let record = store.upsert_pending(key, &content, None)?;
        info!(title = %record.title, "Pending record written");

        let translation = self.spawn_translation(content.translatable());
        self.run_stages(record, None, policies, translation).await
    }

    async fn continue_record(
        &self,
        record: ArtefactRecord,
        state: Option<PipelineState>,
        policies: Policies,
    ) -> Result<ArtefactRecord> {
        let translation = if record.has_translations() {
            TranslationTask::none()
        } else {
            self.spawn_translation(record.translatable())
        };
        self.run_stages(record, state, policies, translation).await
    }

    fn spawn_translation(&self, fields: TranslatableFields) -> TranslationTask {
        let Some(translator) = self.collaborators.translator.clone() else {
            return TranslationTask::none();
        };
        let handle = tokio::spawn(
            async move { translator.translate(&fields).await }.instrument(tracing::Span::current()),
        );
        TranslationTask {
            handle: Some(handle),
        }
    }

    fn checkpoint(&self, key: CalendarKey, state: &PipelineState) -> Result<()> {
        self.repo.store().update_state(key, &state.encode())?;
        debug!(stage = %state.stage(), task_id = state.active_task_id(), "Checkpoint");
        Ok(())
    }

    /// Drive the record from `state` (or from before the image task) to completion.
    async fn run_stages(
        &self,
        record: ArtefactRecord,
        state: Option<PipelineState>,
        policies: Policies,
        translation: TranslationTask,
    ) -> Result<ArtefactRecord> {
        let key = record.key;
        let tasks = self.collaborators.tasks.as_ref();

        let mut state = match state {
            Some(state) => {
                info!(stage = %state.stage(), task_id = state.active_task_id(), "Resuming from checkpoint");
                state
            }
            None => {
                let task_id = tasks
                    .create_task(&TaskRequest::image(record.model_prompt.as_str()))
                    .await?;
                info!(task_id = %task_id, "Image task created");
                let state = PipelineState::image(task_id);
                self.checkpoint(key, &state)?;
                state
            }
        };

        let model_task_id = loop {
            state = match state {
                PipelineState::Image {
                    task_id,
                    image_url: None,
                } => {
                    let url =
                        wait_for(tasks, TaskKind::Image, &task_id, policies.image, &self.cancel)
                            .await?;
                    info!(task_id = %task_id, "Image resolved");
                    let state = PipelineState::Image {
                        task_id,
                        image_url: Some(url),
                    };
                    self.checkpoint(key, &state)?;
                    state
                }
                PipelineState::Image {
                    task_id,
                    image_url: Some(image_url),
                } => {
                    let model_task_id = tasks
                        .create_task(&TaskRequest::image_to_model(image_url.as_str()))
                        .await?;
                    info!(task_id = %model_task_id, "Model task created");
                    let state = PipelineState::Model {
                        image_task_id: task_id,
                        image_url,
                        model_task_id,
                    };
                    self.checkpoint(key, &state)?;
                    state
                }
                PipelineState::Model { model_task_id, .. } => break model_task_id,
                PipelineState::Legacy { task_id } => break task_id,
            };
        };

        // The translation keeps running in its own task; an early return drops
        // and aborts it.
        let model_url = wait_for(
            tasks,
            TaskKind::ImageToModel,
            &model_task_id,
            policies.model,
            &self.cancel,
        )
        .await?;
        info!(task_id = %model_task_id, "Model resolved");
        let translations = translation.join().await;

        self.finish(key, &model_url, translations).await
    }

    async fn finish(
        &self,
        key: CalendarKey,
        model_url: &str,
        translations: Option<Translations>,
    ) -> Result<ArtefactRecord> {
        let data = self.collaborators.fetcher.fetch(model_url).await?;
        let size = data.len();
        let asset_ref = self.collaborators.assets.put(key, data).await?;
        let mut record = self.repo.complete(key, &asset_ref)?;
        info!(asset_ref = %asset_ref, bytes = size, "Artefact completed");

        if let Some(translations) = translations {
            match self.repo.set_translations(key, &translations) {
                Ok(()) => record.translations = Some(translations),
                Err(e) => warn!(error = %e, "Could not store translations"),
            }
        }
        Ok(record)
    }
}
