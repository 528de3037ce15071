//! Clients for the remote collaborators of the artefact pipeline.
//!
//! Each collaborator sits behind an async trait so the orchestrator can be
//! driven by real HTTP clients or by the scripted mocks in [`mock`].
//!
//! ```text
//! ┌──────────────┐  ┌──────────────────┐  ┌────────────┐
//! │ SourceSearch │─▶│ ContentGenerator │─▶│ TaskService│──▶ AssetFetcher
//! └──────────────┘  └──────────────────┘  └────────────┘
//!                            │
//!                            ▼
//!                       Translator
//! ```

pub mod chat;
pub mod content;
pub mod error;
pub mod fetch;
pub mod mock;
pub mod search;
pub mod task;
pub mod translate;
pub mod tripo;

pub use chat::{ChatClient, ChatConfig, DEFAULT_OPENAI_BASE, with_retry};
pub use content::{ContentGenerator, OpenAiContentGenerator};
pub use error::{RemoteError, Result, ServiceKind};
pub use fetch::{AssetFetcher, HttpAssetFetcher};
pub use mock::{
    MockAssetFetcher, MockContentGenerator, MockPoll, MockSourceSearch, MockTaskService,
    MockTranslator, sample_content,
};
pub use search::{DEFAULT_TAVILY_URL, SourceSearch, TavilyConfig, TavilySearch};
pub use task::{TaskKind, TaskOutput, TaskRequest, TaskService, TaskState, TaskStatus};
pub use translate::{OpenAiTranslator, Translator, language_name};
pub use tripo::{DEFAULT_TRIPO_BASE, TripoClient, TripoConfig};
