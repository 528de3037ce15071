//! Scripted collaborators for tests.
//!
//! Every mock records the calls it receives so callers can assert on how
//! often (and with what) a remote service would have been hit.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use artefact_types::{
    CalendarKey, GeneratedContent, RecentEntry, SourceItem, TranslatableFields, Translations,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::content::ContentGenerator;
use crate::error::{RemoteError, Result, ServiceKind};
use crate::fetch::AssetFetcher;
use crate::search::SourceSearch;
use crate::task::{TaskKind, TaskOutput, TaskRequest, TaskService, TaskState, TaskStatus};
use crate::translate::Translator;

/// Content with every field filled, titled `title`.
pub fn sample_content(title: &str) -> GeneratedContent {
    GeneratedContent {
        title: title.to_string(),
        description: format!("A note about {title}."),
        latitude: 35.68,
        longitude: 139.76,
        location_name: "Tokyo, Japan".to_string(),
        model_prompt: format!("{title}, claymation style, soft studio lighting"),
        source_event: format!("News behind {title}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task service
// ─────────────────────────────────────────────────────────────────────────────

/// One scripted poll response.
#[derive(Debug, Clone)]
pub enum MockPoll {
    Status(TaskStatus),
    /// A non-2xx response with this HTTP status.
    HttpError(u16),
}

impl MockPoll {
    pub fn queued() -> Self {
        Self::Status(TaskStatus::new(TaskState::Queued))
    }

    pub fn running(progress: u8) -> Self {
        Self::Status(TaskStatus::new(TaskState::Running).with_progress(progress))
    }

    pub fn image_ready(url: impl Into<String>) -> Self {
        Self::Status(TaskStatus::new(TaskState::Success).with_output(TaskOutput {
            generated_image: Some(url.into()),
            ..Default::default()
        }))
    }

    pub fn model_ready(url: impl Into<String>) -> Self {
        Self::Status(TaskStatus::new(TaskState::Success).with_output(TaskOutput {
            pbr_model: Some(url.into()),
            ..Default::default()
        }))
    }

    /// Success with no output at all.
    pub fn success_without_output() -> Self {
        Self::Status(TaskStatus::new(TaskState::Success))
    }

    pub fn failed() -> Self {
        Self::Status(TaskStatus::new(TaskState::Failed))
    }
}

type PollHook = Box<dyn Fn(&str) + Send + Sync>;

/// A scripted task service.
///
/// Polls for a scripted id return the script in order, repeating the last
/// entry once exhausted. Ids without a script succeed on the first poll with
/// a URL matching the kind they were created as.
#[derive(Default)]
pub struct MockTaskService {
    task_ids: Mutex<VecDeque<String>>,
    scripts: Mutex<HashMap<String, VecDeque<MockPoll>>>,
    failing_creates: Mutex<HashSet<TaskKind>>,
    kinds: Mutex<HashMap<String, TaskKind>>,
    created: Mutex<Vec<TaskRequest>>,
    polls: Mutex<Vec<String>>,
    on_poll: Mutex<Option<PollHook>>,
}

impl MockTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out these ids to created tasks, in order.
    pub fn with_task_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.task_ids.lock().extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_script(self, task_id: impl Into<String>, polls: Vec<MockPoll>) -> Self {
        self.scripts
            .lock()
            .insert(task_id.into(), polls.into_iter().collect());
        self
    }

    /// Make every `create_task` of this kind fail with a 500.
    pub fn failing_create(self, kind: TaskKind) -> Self {
        self.failing_creates.lock().insert(kind);
        self
    }

    /// Run `hook` with the task id before every poll is answered.
    pub fn on_poll(self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        *self.on_poll.lock() = Some(Box::new(hook));
        self
    }

    pub fn created(&self) -> Vec<TaskRequest> {
        self.created.lock().clone()
    }

    pub fn create_count(&self, kind: TaskKind) -> usize {
        self.created.lock().iter().filter(|r| r.kind() == kind).count()
    }

    pub fn polls(&self) -> Vec<String> {
        self.polls.lock().clone()
    }

    pub fn poll_count(&self, task_id: &str) -> usize {
        self.polls.lock().iter().filter(|id| *id == task_id).count()
    }

    /// Total remote calls of either kind.
    pub fn call_count(&self) -> usize {
        self.created.lock().len() + self.polls.lock().len()
    }

    fn default_status(&self, task_id: &str) -> TaskStatus {
        let kind = self.kinds.lock().get(task_id).copied();
        let output = match kind {
            Some(TaskKind::Image) => TaskOutput {
                generated_image: Some(format!("https://mock.test/{task_id}.png")),
                ..Default::default()
            },
            Some(TaskKind::ImageToModel) => TaskOutput {
                pbr_model: Some(format!("https://mock.test/{task_id}.glb")),
                ..Default::default()
            },
            None => TaskOutput {
                generated_image: Some(format!("https://mock.test/{task_id}.png")),
                pbr_model: Some(format!("https://mock.test/{task_id}.glb")),
                ..Default::default()
            },
        };
        TaskStatus::new(TaskState::Success).with_output(output)
    }
}

#[async_trait]
impl TaskService for MockTaskService {
    async fn create_task(&self, request: &TaskRequest) -> Result<String> {
        let kind = request.kind();
        let n = {
            let mut created = self.created.lock();
            created.push(request.clone());
            created.len()
        };

        if self.failing_creates.lock().contains(&kind) {
            return Err(RemoteError::status(ServiceKind::TaskService, 500, "mock create failure"));
        }

        let id = self
            .task_ids
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("{kind}-task-{n}"));
        self.kinds.lock().insert(id.clone(), kind);
        Ok(id)
    }

    async fn poll_once(&self, task_id: &str) -> Result<TaskStatus> {
        self.polls.lock().push(task_id.to_string());
        if let Some(hook) = self.on_poll.lock().as_ref() {
            hook(task_id);
        }

        let scripted = {
            let mut scripts = self.scripts.lock();
            scripts.get_mut(task_id).and_then(|script| {
                if script.len() > 1 {
                    script.pop_front()
                } else {
                    script.front().cloned()
                }
            })
        };

        match scripted {
            Some(MockPoll::Status(status)) => Ok(status),
            Some(MockPoll::HttpError(code)) => Err(RemoteError::status(
                ServiceKind::TaskService,
                code,
                "mock poll failure",
            )),
            None => Ok(self.default_status(task_id)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content generator
// ─────────────────────────────────────────────────────────────────────────────

/// One recorded content generation call.
#[derive(Debug, Clone)]
pub struct ContentCall {
    pub key: CalendarKey,
    pub sources: usize,
    pub recent: Vec<RecentEntry>,
}

pub struct MockContentGenerator {
    content: Option<GeneratedContent>,
    calls: Mutex<Vec<ContentCall>>,
}

impl MockContentGenerator {
    pub fn new(content: GeneratedContent) -> Self {
        Self {
            content: Some(content),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A generator whose reply is always empty.
    pub fn failing() -> Self {
        Self {
            content: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ContentCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ContentGenerator for MockContentGenerator {
    async fn generate(
        &self,
        key: CalendarKey,
        sources: &[SourceItem],
        recent: &[RecentEntry],
    ) -> Result<GeneratedContent> {
        self.calls.lock().push(ContentCall {
            key,
            sources: sources.len(),
            recent: recent.to_vec(),
        });
        self.content
            .clone()
            .ok_or(RemoteError::EmptyResponse(ServiceKind::ContentGenerator))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Translator
// ─────────────────────────────────────────────────────────────────────────────

/// Translates by prefixing each field with `[lang] `.
pub struct MockTranslator {
    languages: Vec<String>,
    fail: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<TranslatableFields>>,
}

impl MockTranslator {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            fail: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A translator for which every language fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(["en", "ja"])
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<TranslatableFields> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, fields: &TranslatableFields) -> Result<Translations> {
        self.calls.lock().push(fields.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RemoteError::status(ServiceKind::Translator, 503, "mock translator down"));
        }

        Ok(self
            .languages
            .iter()
            .map(|lang| {
                let tag = |s: &str| format!("[{lang}] {s}");
                (
                    lang.clone(),
                    TranslatableFields {
                        title: tag(&fields.title),
                        description: tag(&fields.description),
                        location_name: tag(&fields.location_name),
                        source_event: tag(&fields.source_event),
                    },
                )
            })
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Source search
// ─────────────────────────────────────────────────────────────────────────────

pub struct MockSourceSearch {
    items: Option<Vec<SourceItem>>,
    calls: Mutex<Vec<CalendarKey>>,
}

impl MockSourceSearch {
    pub fn new(items: Vec<SourceItem>) -> Self {
        Self {
            items: Some(items),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// One generic news item.
    pub fn single() -> Self {
        Self::new(vec![SourceItem {
            title: "Robot vacuums unionise".to_string(),
            url: "https://news.test/robots".to_string(),
            content: "A fleet of cleaning robots refused to start.".to_string(),
            score: 0.8,
        }])
    }

    pub fn failing() -> Self {
        Self {
            items: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CalendarKey> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl SourceSearch for MockSourceSearch {
    async fn search(&self, key: CalendarKey) -> Result<Vec<SourceItem>> {
        self.calls.lock().push(key);
        self.items
            .clone()
            .ok_or_else(|| RemoteError::status(ServiceKind::SourceSearch, 502, "mock search down"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Asset fetch
// ─────────────────────────────────────────────────────────────────────────────

/// Returns `glb:<url>` as the payload of any URL.
#[derive(Default)]
pub struct MockAssetFetcher {
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl MockAssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl AssetFetcher for MockAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.calls.lock().push(url.to_string());
        if self.fail {
            return Err(RemoteError::status(ServiceKind::AssetFetch, 404, "mock asset missing"));
        }
        Ok(Bytes::from(format!("glb:{url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_repeats_last_entry() {
        let service = MockTaskService::new()
            .with_task_ids(["img-1"])
            .with_script("img-1", vec![MockPoll::running(10), MockPoll::queued()]);

        let id = service.create_task(&TaskRequest::image("duck")).await.unwrap();
        assert_eq!(id, "img-1");

        assert_eq!(service.poll_once(&id).await.unwrap().progress, Some(10));
        for _ in 0..3 {
            assert_eq!(service.poll_once(&id).await.unwrap().state, TaskState::Queued);
        }
        assert_eq!(service.poll_count("img-1"), 4);
    }

    #[tokio::test]
    async fn test_unscripted_task_succeeds_by_kind() {
        let service = MockTaskService::new();
        let image = service.create_task(&TaskRequest::image("duck")).await.unwrap();
        let model = service
            .create_task(&TaskRequest::image_to_model("https://x/duck.png"))
            .await
            .unwrap();

        let status = service.poll_once(&image).await.unwrap();
        assert!(status.result_ref(TaskKind::Image).unwrap().ends_with(".png"));
        assert!(status.result_ref(TaskKind::ImageToModel).is_none());

        let status = service.poll_once(&model).await.unwrap();
        assert!(status.result_ref(TaskKind::ImageToModel).unwrap().ends_with(".glb"));
        assert_eq!(service.create_count(TaskKind::Image), 1);
        assert_eq!(service.call_count(), 4);
    }

    #[tokio::test]
    async fn test_failing_create_is_recorded() {
        let service = MockTaskService::new().failing_create(TaskKind::Image);
        let err = service.create_task(&TaskRequest::image("duck")).await.unwrap_err();
        assert_eq!(err.http_status(), Some(500));
        assert_eq!(service.create_count(TaskKind::Image), 1);
    }

    #[tokio::test]
    async fn test_mock_translator() {
        let translator = MockTranslator::new(["en", "ja"]);
        let fields = sample_content("Fan").translatable();
        let result = translator.translate(&fields).await.unwrap();
        assert_eq!(result.get("ja").unwrap().title, "[ja] Fan");

        assert!(MockTranslator::failing().translate(&fields).await.is_err());
    }
}
