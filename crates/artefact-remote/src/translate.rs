//! Translation of the four textual fields into the target languages.

use artefact_types::{LanguageTranslation, TranslatableFields, Translations};
use async_trait::async_trait;
use futures::future::join_all;

use crate::chat::{ChatClient, ChatConfig};
use crate::error::{RemoteError, Result, ServiceKind};

/// Translates textual fields into several languages.
///
/// Languages that fail are left out of the result. An error is returned only
/// when no language could be translated at all.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, fields: &TranslatableFields) -> Result<Translations>;
}

/// English name of a language code, for prompting.
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "es" => "Spanish",
        "ru" => "Russian",
        "pt" => "Portuguese",
        "zh" => "Chinese",
        other => other,
    }
}

fn build_prompt(fields: &TranslatableFields, language: &str) -> Result<String> {
    let input = serde_json::to_string_pretty(fields)
        .map_err(|e| RemoteError::Internal(format!("Failed to encode fields: {e}")))?;
    Ok(format!(
        "You are a professional translator. Translate the following content to {}.\n\
         Keep the same tone: the description is playful, like chatting with a friend.\n\n\
         Input:\n{input}\n\n\
         Output ONLY a JSON object with the same four keys \
         (title, description, location_name, source_event).",
        language_name(language)
    ))
}

/// Translator backed by an OpenAI-compatible chat endpoint, one request per language.
pub struct OpenAiTranslator {
    chat: ChatClient,
    languages: Vec<String>,
}

impl OpenAiTranslator {
    pub fn new(config: ChatConfig, languages: Vec<String>) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::new(config, ServiceKind::Translator)?,
            languages,
        })
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    async fn translate_one(
        &self,
        fields: &TranslatableFields,
        language: &str,
    ) -> Result<LanguageTranslation> {
        let prompt = build_prompt(fields, language)?;
        let raw = self.chat.complete_json(None, &prompt).await?;
        serde_json::from_str(raw.trim()).map_err(|e| RemoteError::decode(ServiceKind::Translator, e))
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, fields: &TranslatableFields) -> Result<Translations> {
        let attempts = join_all(self.languages.iter().map(|lang| async move {
            (lang.clone(), self.translate_one(fields, lang).await)
        }))
        .await;

        collect_partial(attempts)
    }
}

/// Keep every successful language; fail only if nothing succeeded.
pub fn collect_partial(
    attempts: Vec<(String, Result<LanguageTranslation>)>,
) -> Result<Translations> {
    let mut translations = Translations::new();
    let mut first_error = None;

    for (language, attempt) in attempts {
        match attempt {
            Ok(t) => translations.insert(language, t),
            Err(e) => {
                tracing::warn!(language = %language, error = %e, "Translation failed");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if translations.is_empty() => Err(e),
        _ => Ok(translations),
    }
}
