//! Language paths: the chain of languages from the input's top language down
//! to an embedded language.
//!
//! Paths are canonical. Asking twice for the same chain of languages yields
//! the same instance, so paths compare and hash by identity and can key maps
//! cheaply. Each path caches its one-language extensions weakly; an extension
//! nobody references any more is dropped and recreated on demand.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{interner, Language};

struct PathInner {
    languages: Box<[Language]>,
    parent: Option<LanguagePath>,
    /// One-language extensions keyed by language slot.
    children: Mutex<FxHashMap<u32, Weak<PathInner>>>,
    mime_path: OnceLock<&'static str>,
}

/// Canonical sequence of languages, outermost first.
#[derive(Clone)]
pub struct LanguagePath(Arc<PathInner>);

impl LanguagePath {
    fn empty() -> &'static LanguagePath {
        static EMPTY: OnceLock<LanguagePath> = OnceLock::new();
        EMPTY.get_or_init(|| {
            LanguagePath(Arc::new(PathInner {
                languages: Box::new([]),
                parent: None,
                children: Mutex::new(FxHashMap::default()),
                mime_path: OnceLock::new(),
            }))
        })
    }

    /// The single-language path of `language`.
    pub fn get(language: &Language) -> LanguagePath {
        Self::empty().embedded(language)
    }

    /// `prefix` extended by `language`.
    pub fn get_with_prefix(prefix: &LanguagePath, language: &Language) -> LanguagePath {
        prefix.embedded(language)
    }

    /// This path extended by `language`.
    pub fn embedded(&self, language: &Language) -> LanguagePath {
        let key = language.id();
        let mut children = self.0.children.lock();
        if let Some(child) = children.get(&key).and_then(Weak::upgrade) {
            return LanguagePath(child);
        }
        children.retain(|_, child| child.strong_count() > 0);

        let mut languages = Vec::with_capacity(self.size() + 1);
        languages.extend_from_slice(&self.0.languages);
        languages.push(language.clone());
        let parent = if self.0.languages.is_empty() {
            None
        } else {
            Some(self.clone())
        };
        let child = Arc::new(PathInner {
            languages: languages.into_boxed_slice(),
            parent,
            children: Mutex::new(FxHashMap::default()),
            mime_path: OnceLock::new(),
        });
        children.insert(key, Arc::downgrade(&child));
        tracing::trace!(
            depth = child.languages.len(),
            language = language.mime_type(),
            "language path created"
        );
        LanguagePath(child)
    }

    /// This path extended by every language of `suffix`.
    pub fn embedded_path(&self, suffix: &LanguagePath) -> LanguagePath {
        suffix
            .languages()
            .iter()
            .fold(self.clone(), |path, language| path.embedded(language))
    }

    /// The path without its innermost language, or `None` for a one-language
    /// path.
    #[inline]
    pub fn parent(&self) -> Option<&LanguagePath> {
        self.0.parent.as_ref()
    }

    /// Number of languages in the path.
    #[inline]
    pub fn size(&self) -> usize {
        self.0.languages.len()
    }

    /// Language at `index`, outermost first.
    #[inline]
    pub fn language(&self, index: usize) -> Option<&Language> {
        self.0.languages.get(index)
    }

    #[inline]
    pub fn languages(&self) -> &[Language] {
        &self.0.languages
    }

    /// Outermost language.
    pub fn top_language(&self) -> &Language {
        &self.0.languages[0]
    }

    /// Innermost language.
    pub fn inner_language(&self) -> &Language {
        &self.0.languages[self.0.languages.len() - 1]
    }

    pub fn contains(&self, language: &Language) -> bool {
        self.index_of(language).is_some()
    }

    pub fn index_of(&self, language: &Language) -> Option<usize> {
        self.0.languages.iter().position(|l| l == language)
    }

    /// Path of the languages in `start..end`.
    ///
    /// Returns `None` for an empty or out-of-range selection.
    pub fn sub_path(&self, start: usize, end: usize) -> Option<LanguagePath> {
        if start >= end || end > self.size() {
            return None;
        }
        if start == 0 && end == self.size() {
            return Some(self.clone());
        }
        if start == 0 {
            let mut path = self;
            while path.size() > end {
                path = path.parent()?;
            }
            return Some(path.clone());
        }
        let languages = &self.0.languages[start..end];
        let first = Self::get(&languages[0]);
        Some(
            languages[1..]
                .iter()
                .fold(first, |path, language| path.embedded(language)),
        )
    }

    /// Returns `true` if the innermost languages of this path are `suffix`.
    pub fn ends_with(&self, suffix: &LanguagePath) -> bool {
        self.size() >= suffix.size()
            && self.0.languages[self.size() - suffix.size()..] == suffix.0.languages[..]
    }

    /// Mime types of the path joined by `/`, e.g. `text/html/text/javascript`.
    pub fn mime_path(&self) -> &'static str {
        self.0.mime_path.get_or_init(|| {
            let joined = self
                .0
                .languages
                .iter()
                .map(Language::mime_type)
                .collect::<Vec<_>>()
                .join("/");
            interner::global().intern_str(&joined)
        })
    }

    #[inline]
    pub fn ptr_eq(&self, other: &LanguagePath) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for LanguagePath {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for LanguagePath {}

impl Hash for LanguagePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for LanguagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LanguagePath({})", self.mime_path())
    }
}
