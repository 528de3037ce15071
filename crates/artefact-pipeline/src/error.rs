//! Error types for orchestration.

use artefact_remote::{RemoteError, TaskKind};
use artefact_store::StoreError;
use artefact_types::CalendarKey;
use thiserror::Error;

/// Result type for orchestration.
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// A remote collaborator call failed.
    #[error(transparent)]
    RemoteService(#[from] RemoteError),

    /// The remote service reported the task as failed.
    #[error("Remote {kind} task {task_id} failed")]
    RemoteTaskFailed { kind: TaskKind, task_id: String },

    /// The task succeeded but did not deliver the expected output.
    #[error("Remote {kind} task {task_id} succeeded without '{field}'")]
    MalformedResult {
        kind: TaskKind,
        task_id: String,
        field: &'static str,
    },

    /// Poll attempts were exhausted before the task reached a terminal state.
    #[error("Remote {kind} task {task_id} still not finished after {attempts} polls")]
    Timeout {
        kind: TaskKind,
        task_id: String,
        attempts: u32,
    },

    #[error("Waiting on {kind} task {task_id} was cancelled")]
    Cancelled { kind: TaskKind, task_id: String },

    /// Completion was requested for a key that has no record.
    #[error("No artefact record for {0}")]
    NotFound(CalendarKey),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("A pipeline for {0} is already running in this process")]
    AlreadyRunning(CalendarKey),

    #[error("Nothing to resume for {0}")]
    NothingToResume(CalendarKey),
}

impl From<StoreError> for OrchestrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => Self::NotFound(key),
            other => Self::Store(other),
        }
    }
}

impl OrchestrationError {
    /// Whether the key must be marked failed before this error is re-raised.
    ///
    /// Store failures and cancellation leave the record `generating` with its
    /// last checkpoint, the same as a crash, so it can be resumed.
    pub fn marks_failed(&self) -> bool {
        match self {
            Self::RemoteService(_)
            | Self::RemoteTaskFailed { .. }
            | Self::MalformedResult { .. }
            | Self::Timeout { .. }
            | Self::NotFound(_) => true,
            Self::Cancelled { .. }
            | Self::Store(_)
            | Self::AlreadyRunning(_)
            | Self::NothingToResume(_) => false,
        }
    }

    /// Whether resuming later with a larger poll budget could succeed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
