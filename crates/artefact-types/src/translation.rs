//! Per-language translations of an artefact's textual fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Languages every artefact is translated into.
pub const TARGET_LANGUAGES: &[&str] = &["en", "ja", "ko", "es", "ru", "pt"];

/// The four textual fields that are translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatableFields {
    pub title: String,
    pub description: String,
    pub location_name: String,
    pub source_event: String,
}

/// The translated form of [`TranslatableFields`] for one language.
pub type LanguageTranslation = TranslatableFields;

/// Translations keyed by language code. Languages that failed are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations(BTreeMap<String, LanguageTranslation>);

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, language: impl Into<String>, translation: LanguageTranslation) {
        self.0.insert(language.into(), translation);
    }

    pub fn get(&self, language: &str) -> Option<&LanguageTranslation> {
        self.0.get(language)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, LanguageTranslation)> for Translations {
    fn from_iter<I: IntoIterator<Item = (String, LanguageTranslation)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str) -> TranslatableFields {
        TranslatableFields {
            title: title.to_string(),
            description: "d".to_string(),
            location_name: "l".to_string(),
            source_event: "s".to_string(),
        }
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut t = Translations::new();
        t.insert("en", fields("Hello"));
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["en"]["title"], "Hello");
    }

    #[test]
    fn test_partial_languages() {
        let t: Translations = vec![("ja".to_string(), fields("こんにちは"))]
            .into_iter()
            .collect();
        assert_eq!(t.len(), 1);
        assert!(t.get("en").is_none());
        assert_eq!(t.languages().collect::<Vec<_>>(), vec!["ja"]);
    }
}
