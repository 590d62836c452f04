//! Token ids: the type of a token within one language.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::interner;

struct TokenIdData {
    name: &'static str,
    ordinal: u32,
    primary_category: Option<&'static str>,
    fixed_text: Option<Arc<str>>,
}

/// The type of a token within a [`Language`](crate::Language).
///
/// Ids are immutable and cheap to clone. Equality is identity: two ids are
/// equal only when they are clones of the same definition, so ids of two
/// languages never compare equal even if name and ordinal coincide.
#[derive(Clone)]
pub struct TokenId(Arc<TokenIdData>);

impl TokenId {
    /// Define an id with an optional primary category.
    pub fn new(name: &str, ordinal: u32, primary_category: Option<&str>) -> Self {
        let interner = interner::global();
        TokenId(Arc::new(TokenIdData {
            name: interner.intern_str(name),
            ordinal,
            primary_category: primary_category.map(|c| interner.intern_str(c)),
            fixed_text: None,
        }))
    }

    /// Define an id whose tokens always have the same text.
    ///
    /// Tokens of fixed-text ids are produced as flyweights: one shared,
    /// offset-less instance per id.
    pub fn with_fixed_text(
        name: &str,
        ordinal: u32,
        primary_category: Option<&str>,
        fixed_text: &str,
    ) -> Self {
        let interner = interner::global();
        TokenId(Arc::new(TokenIdData {
            name: interner.intern_str(name),
            ordinal,
            primary_category: primary_category.map(|c| interner.intern_str(c)),
            fixed_text: Some(Arc::from(fixed_text)),
        }))
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.0.name
    }

    #[inline]
    pub fn ordinal(&self) -> u32 {
        self.0.ordinal
    }

    #[inline]
    pub fn primary_category(&self) -> Option<&'static str> {
        self.0.primary_category
    }

    /// Text shared by every token of this id, if the id declares one.
    pub fn fixed_text(&self) -> Option<&str> {
        self.0.fixed_text.as_deref()
    }

    pub(crate) fn fixed_text_arc(&self) -> Option<&Arc<str>> {
        self.0.fixed_text.as_ref()
    }

    /// Returns `true` if both handles are the same definition.
    #[inline]
    pub fn ptr_eq(&self, other: &TokenId) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for TokenId {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TokenId {}

impl Hash for TokenId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.0.name, self.0.ordinal)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name)
    }
}
