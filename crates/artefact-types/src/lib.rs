//! Shared domain types for the daily artefact generator.
//!
//! Every crate in the workspace speaks in these types: the calendar key that
//! identifies one generation cycle, the persisted artefact record, the content
//! produced by the generator, and per-language translations.

pub mod content;
pub mod error;
pub mod key;
pub mod record;
pub mod translation;

pub use content::{GeneratedContent, RecentEntry, SourceItem};
pub use error::{Error, Result};
pub use key::CalendarKey;
pub use record::{ArtefactRecord, ArtefactStatus};
pub use translation::{LanguageTranslation, TARGET_LANGUAGES, TranslatableFields, Translations};
