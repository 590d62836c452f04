//! Languages: the complete token-id set of one grammar.
//!
//! A [`Language`] is built once from a [`LanguageDef`] capability and then
//! shared by handle. It indexes its ids by ordinal and by name, groups them
//! into categories, and lazily computes per-id category lists.
//!
//! # Identity
//!
//! Languages compare and hash by identity. A language holds lazily filled
//! caches and is meant to exist once per definition, so structural equality
//! would be both expensive and misleading.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::category::{CategoryList, CategoryLists};
use crate::slot::LanguageSlot;
use crate::{
    interner, InputAttributes, LanguageEmbedding, LanguageError, LanguagePath, Lexer,
    LexerRestartInfo, Token, TokenId, TokenIdSet,
};

/// Capability object describing one language.
///
/// One implementation exists per language. The core never inspects how ids
/// map to characters; that knowledge lives entirely in the lexer returned by
/// [`create_lexer`](LanguageDef::create_lexer).
pub trait LanguageDef: Send + Sync + 'static {
    /// Mime type such as `text/html`.
    fn mime_type(&self) -> &str;

    /// Every token id of the language.
    fn token_ids(&self) -> Vec<TokenId>;

    /// Named categories and their members, in addition to the primary
    /// category each id declares.
    fn token_categories(&self) -> Vec<(String, Vec<TokenId>)> {
        Vec::new()
    }

    /// Create a lexer resuming in `info.state`.
    fn create_lexer(&self, info: &LexerRestartInfo<'_>) -> Box<dyn Lexer>;

    /// Default embedding for a token of this language, if any.
    ///
    /// `path` is the language path of the list containing `token`.
    fn embedding(
        &self,
        _token: &Token,
        _path: &LanguagePath,
        _attributes: Option<&InputAttributes>,
    ) -> Option<LanguageEmbedding> {
        None
    }

    /// Languages that [`embedding`](LanguageDef::embedding) may return.
    ///
    /// Used to enumerate statically reachable language paths without lexing.
    fn embedded_languages(&self) -> Vec<Language> {
        Vec::new()
    }
}

struct LanguageInner {
    slot: LanguageSlot,
    mime_type: &'static str,
    def: Box<dyn LanguageDef>,
    /// Ids in ordinal order.
    ids: Vec<TokenId>,
    /// Ordinal-indexed ids; gaps are `None`.
    by_ordinal: Vec<Option<TokenId>>,
    by_name: FxHashMap<&'static str, TokenId>,
    categories: FxHashMap<&'static str, TokenIdSet>,
    category_lists: OnceLock<CategoryLists>,
    flyweights: Mutex<FxHashMap<u32, Token>>,
}

/// Shared handle to a language.
#[derive(Clone)]
pub struct Language(Arc<LanguageInner>);

impl Language {
    /// Build a language from its definition.
    ///
    /// Fails if the mime type does not contain exactly one `/`, if no ids
    /// are declared, or if ids, names, ordinals or categories are duplicated
    /// or refer to ids outside the language.
    pub fn new(def: impl LanguageDef) -> Result<Language, LanguageError> {
        let raw_mime = def.mime_type();
        if raw_mime.matches('/').count() != 1 {
            return Err(LanguageError::InvalidMimeType {
                mime_type: raw_mime.to_owned(),
            });
        }
        let mime_type = interner::global().intern_str(raw_mime);

        let mut ids = def.token_ids();
        if ids.is_empty() {
            return Err(LanguageError::NoTokenIds { mime_type });
        }
        ids.sort_by_key(TokenId::ordinal);

        let max_ordinal = ids.last().map_or(0, TokenId::ordinal);
        let mut by_ordinal: Vec<Option<TokenId>> = vec![None; max_ordinal as usize + 1];
        let mut by_name = FxHashMap::default();
        for id in &ids {
            match &by_ordinal[id.ordinal() as usize] {
                Some(existing) if existing.ptr_eq(id) => {
                    return Err(LanguageError::DuplicateTokenId {
                        mime_type,
                        name: id.name(),
                    });
                }
                Some(existing) => {
                    return Err(LanguageError::DuplicateOrdinal {
                        mime_type,
                        ordinal: id.ordinal(),
                        first: existing.name(),
                        second: id.name(),
                    });
                }
                None => by_ordinal[id.ordinal() as usize] = Some(id.clone()),
            }
            if by_name.insert(id.name(), id.clone()).is_some() {
                return Err(LanguageError::DuplicateName {
                    mime_type,
                    name: id.name(),
                });
            }
        }
        if ids.len() * 2 + 16 < by_ordinal.len() {
            tracing::debug!(
                mime_type,
                ids = ids.len(),
                max_ordinal,
                "sparse ordinals, ordinal index has large gaps"
            );
        }

        let is_member = |id: &TokenId| {
            by_ordinal
                .get(id.ordinal() as usize)
                .and_then(Option::as_ref)
                .is_some_and(|member| member.ptr_eq(id))
        };

        let mut categories: FxHashMap<&'static str, TokenIdSet> = FxHashMap::default();
        for (category, members) in def.token_categories() {
            let name = interner::global().intern_str(&category);
            if categories.contains_key(name) {
                return Err(LanguageError::DuplicateCategory {
                    mime_type,
                    category,
                });
            }
            let mut set = TokenIdSet::with_max_ordinal(max_ordinal);
            for id in members {
                if !is_member(&id) {
                    return Err(LanguageError::CategoryMemberNotInLanguage {
                        mime_type,
                        category,
                        name: id.name(),
                    });
                }
                set.insert(id);
            }
            categories.insert(name, set);
        }
        for id in &ids {
            if let Some(primary) = id.primary_category() {
                categories
                    .entry(primary)
                    .or_insert_with(|| TokenIdSet::with_max_ordinal(max_ordinal))
                    .insert(id.clone());
            }
        }

        tracing::debug!(
            mime_type,
            ids = ids.len(),
            categories = categories.len(),
            "language created"
        );

        Ok(Language(Arc::new(LanguageInner {
            slot: LanguageSlot::acquire(),
            mime_type,
            def: Box::new(def),
            ids,
            by_ordinal,
            by_name,
            categories,
            category_lists: OnceLock::new(),
            flyweights: Mutex::new(FxHashMap::default()),
        })))
    }

    /// Small numeric id, unique among live languages and reused after drop.
    #[inline]
    pub fn id(&self) -> u32 {
        self.0.slot.get()
    }

    #[inline]
    pub fn mime_type(&self) -> &'static str {
        self.0.mime_type
    }

    /// All ids in ordinal order.
    #[inline]
    pub fn token_ids(&self) -> &[TokenId] {
        &self.0.ids
    }

    pub fn max_ordinal(&self) -> u32 {
        self.0.ids.last().map_or(0, TokenId::ordinal)
    }

    /// Returns `true` if `id` is one of this language's ids.
    pub fn is_member(&self, id: &TokenId) -> bool {
        self.token_id(id.ordinal()).is_some_and(|member| member.ptr_eq(id))
    }

    /// Id with the given ordinal, if declared.
    pub fn token_id(&self, ordinal: u32) -> Option<&TokenId> {
        self.0
            .by_ordinal
            .get(ordinal as usize)
            .and_then(Option::as_ref)
    }

    /// Id with the given ordinal; an undeclared ordinal is an error.
    pub fn valid_token_id(&self, ordinal: u32) -> Result<&TokenId, LanguageError> {
        self.token_id(ordinal)
            .ok_or(LanguageError::UnknownOrdinal {
                mime_type: self.0.mime_type,
                ordinal,
            })
    }

    /// Id with the given name, if declared.
    pub fn token_id_by_name(&self, name: &str) -> Option<&TokenId> {
        self.0.by_name.get(name)
    }

    /// Id with the given name; an undeclared name is an error.
    pub fn valid_token_id_by_name(&self, name: &str) -> Result<&TokenId, LanguageError> {
        self.token_id_by_name(name)
            .ok_or_else(|| LanguageError::UnknownName {
                mime_type: self.0.mime_type,
                name: name.to_owned(),
            })
    }

    /// All category names, sorted.
    pub fn token_categories(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.0.categories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Members of a category, if the category exists.
    pub fn token_category_members(&self, category: &str) -> Option<&TokenIdSet> {
        self.0.categories.get(category)
    }

    /// Members of a category; an unknown category is an error.
    pub fn valid_token_category_members(
        &self,
        category: &str,
    ) -> Result<&TokenIdSet, LanguageError> {
        self.token_category_members(category)
            .ok_or_else(|| LanguageError::UnknownCategory {
                mime_type: self.0.mime_type,
                category: category.to_owned(),
            })
    }

    /// Categories of `id`, primary category first.
    ///
    /// Ids with identical category combinations return the same shared list.
    pub fn token_categories_of(&self, id: &TokenId) -> Result<CategoryList, LanguageError> {
        self.check_member(id)?;
        Ok(Arc::clone(self.category_lists().all(id)))
    }

    /// Categories of `id` other than its primary category.
    pub fn non_primary_token_categories(
        &self,
        id: &TokenId,
    ) -> Result<CategoryList, LanguageError> {
        self.check_member(id)?;
        Ok(Arc::clone(self.category_lists().non_primary(id)))
    }

    fn category_lists(&self) -> &CategoryLists {
        self.0.category_lists.get_or_init(|| {
            CategoryLists::build(&self.0.ids, &self.0.categories, self.max_ordinal())
        })
    }

    /// Union of two id collections, all of which must belong to this language.
    pub fn merge<'a>(
        &self,
        a: impl IntoIterator<Item = &'a TokenId>,
        b: impl IntoIterator<Item = &'a TokenId>,
    ) -> Result<TokenIdSet, LanguageError> {
        let mut set = TokenIdSet::with_max_ordinal(self.max_ordinal());
        for id in a.into_iter().chain(b) {
            self.check_member(id)?;
            set.insert(id.clone());
        }
        Ok(set)
    }

    fn check_member(&self, id: &TokenId) -> Result<(), LanguageError> {
        if self.is_member(id) {
            Ok(())
        } else {
            Err(LanguageError::ForeignTokenId {
                mime_type: self.0.mime_type,
                name: id.name(),
            })
        }
    }

    /// The shared offset-less token of a fixed-text id.
    ///
    /// Returns `None` for ids without fixed text or of another language.
    pub fn flyweight_token(&self, id: &TokenId) -> Option<Token> {
        let text = id.fixed_text_arc()?;
        if !self.is_member(id) {
            return None;
        }
        let mut cache = self.0.flyweights.lock();
        let token = cache
            .entry(id.ordinal())
            .or_insert_with(|| Token::flyweight(id.clone(), Arc::clone(text)));
        Some(token.clone())
    }

    /// Create a lexer for this language.
    pub fn create_lexer(&self, info: &LexerRestartInfo<'_>) -> Box<dyn Lexer> {
        self.0.def.create_lexer(info)
    }

    /// Default embedding of `token`, as declared by the definition.
    pub fn embedding(
        &self,
        token: &Token,
        path: &LanguagePath,
        attributes: Option<&InputAttributes>,
    ) -> Option<LanguageEmbedding> {
        self.0.def.embedding(token, path, attributes)
    }

    /// Languages this language may embed by default.
    pub fn embedded_languages(&self) -> Vec<Language> {
        self.0.def.embedded_languages()
    }

    /// Returns `true` if both handles refer to the same language.
    #[inline]
    pub fn ptr_eq(&self, other: &Language) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Language {}

impl Hash for Language {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Language({})", self.0.mime_type)
    }
}
