//! Ordinal-indexed token id sets.

use std::fmt;

use crate::TokenId;

/// A set of token ids indexed by ordinal.
///
/// Membership checks compare identity, so an id of another language that
/// happens to share an ordinal is never reported as a member.
#[derive(Clone, Default)]
pub struct TokenIdSet {
    slots: Vec<Option<TokenId>>,
    len: usize,
}

impl TokenIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set sized for ordinals up to `max_ordinal`.
    pub fn with_max_ordinal(max_ordinal: u32) -> Self {
        TokenIdSet {
            slots: vec![None; max_ordinal as usize + 1],
            len: 0,
        }
    }

    /// Add an id, returning `false` if it was already present.
    ///
    /// # Panics
    /// Panics if a different id already occupies the same ordinal; sets are
    /// only ever filled with ids of one language.
    pub fn insert(&mut self, id: TokenId) -> bool {
        let index = id.ordinal() as usize;
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        match &self.slots[index] {
            Some(existing) if existing.ptr_eq(&id) => false,
            Some(existing) => panic!(
                "token id {id:?} collides with {existing:?} at ordinal {index}"
            ),
            None => {
                self.slots[index] = Some(id);
                self.len += 1;
                true
            }
        }
    }

    pub fn contains(&self, id: &TokenId) -> bool {
        self.slots
            .get(id.ordinal() as usize)
            .and_then(Option::as_ref)
            .is_some_and(|member| member.ptr_eq(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate members in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = &TokenId> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Returns `true` if every member of `other` is a member of `self`.
    pub fn is_superset(&self, other: &TokenIdSet) -> bool {
        other.iter().all(|id| self.contains(id))
    }
}

impl PartialEq for TokenIdSet {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.is_superset(other)
    }
}

impl Eq for TokenIdSet {}

impl fmt::Debug for TokenIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<TokenId> for TokenIdSet {
    fn from_iter<I: IntoIterator<Item = TokenId>>(iter: I) -> Self {
        let mut set = TokenIdSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TokenIdSet {
    type Item = &'a TokenId;
    type IntoIter = Box<dyn Iterator<Item = &'a TokenId> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
