//! Mime-type lookup of languages.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Language;

/// Table of languages by mime type.
///
/// Hosts use a registry to resolve embedded languages by mime type, e.g.
/// from a `type` attribute found in markup.
#[derive(Default)]
pub struct LanguageRegistry {
    languages: RwLock<FxHashMap<&'static str, Language>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `language`, returning the language it replaced, if any.
    pub fn register(&self, language: Language) -> Option<Language> {
        let mime_type = language.mime_type();
        let replaced = self.languages.write().insert(mime_type, language);
        if replaced.is_some() {
            tracing::debug!(mime_type, "language registration replaced");
        }
        replaced
    }

    pub fn find(&self, mime_type: &str) -> Option<Language> {
        self.languages.read().get(mime_type).cloned()
    }

    /// Registered languages sorted by mime type.
    pub fn languages(&self) -> Vec<Language> {
        let languages = self.languages.read();
        let mut all: Vec<_> = languages.values().cloned().collect();
        all.sort_by_key(Language::mime_type);
        all
    }
}
