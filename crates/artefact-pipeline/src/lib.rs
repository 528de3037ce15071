//! Resumable generation of one artefact per calendar key.
//!
//! The [`Orchestrator`] takes a key from content generation through an image
//! task and an image-to-model task to a stored asset. Progress is
//! checkpointed on the record as a [`PipelineState`] before every wait, and
//! [`wait_for`] polls each remote task under a [`RetryPolicy`].

pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod state;

pub use error::{OrchestrationError, Result};
pub use orchestrator::{
    Collaborators, DEFAULT_HISTORY_WINDOW, Orchestrator, OrchestratorConfig, ResumeBudget,
    TranslationOutcome,
};
pub use poller::{RetryPolicy, wait_for};
pub use state::{PipelineState, Stage};
