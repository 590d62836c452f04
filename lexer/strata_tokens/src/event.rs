//! Hierarchy events and listeners.

use std::fmt;

use crate::TokenChange;

/// A single text edit: `removed_length` bytes at `offset` were replaced by
/// `inserted_length` bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TextModification {
    /// Start byte offset of the edit.
    pub offset: usize,
    /// Length of the removed region in the old text.
    pub removed_length: usize,
    /// Length of the inserted text.
    pub inserted_length: usize,
}

impl TextModification {
    #[inline]
    pub const fn new(offset: usize, removed_length: usize, inserted_length: usize) -> Self {
        TextModification {
            offset,
            removed_length,
            inserted_length,
        }
    }

    /// Create an insertion (no characters removed).
    #[inline]
    pub const fn insert(offset: usize, length: usize) -> Self {
        Self::new(offset, 0, length)
    }

    /// Create a removal (no characters inserted).
    #[inline]
    pub const fn remove(offset: usize, length: usize) -> Self {
        Self::new(offset, length, 0)
    }

    /// Net change in text length (positive = grew, negative = shrank).
    #[inline]
    #[expect(
        clippy::cast_possible_wrap,
        reason = "text lengths are far below isize::MAX"
    )]
    pub const fn delta(&self) -> isize {
        self.inserted_length as isize - self.removed_length as isize
    }

    /// End of the removed region in the old text.
    #[inline]
    pub const fn old_end(&self) -> usize {
        self.offset + self.removed_length
    }

    /// End of the inserted region in the new text.
    #[inline]
    pub const fn new_end(&self) -> usize {
        self.offset + self.inserted_length
    }

    /// Returns `true` if the edit removes and inserts nothing.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.removed_length == 0 && self.inserted_length == 0
    }
}

/// What caused a [`TokenHierarchyEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenHierarchyEventKind {
    /// The input text was modified.
    Modification,
    /// A region was relexed on request without a text change.
    Relex,
    /// The whole hierarchy was rebuilt.
    Rebuild,
    /// The hierarchy was activated or deactivated.
    Activity,
    /// A custom embedding was created.
    EmbeddingCreated,
    /// A custom embedding was removed.
    EmbeddingRemoved,
    /// The set of language paths used by the hierarchy grew.
    LanguagePaths,
}

/// Notification delivered to hierarchy listeners.
#[derive(Clone, Debug)]
pub struct TokenHierarchyEvent {
    kind: TokenHierarchyEventKind,
    affected_start: usize,
    affected_end: usize,
    change: Option<TokenChange>,
    modification: Option<TextModification>,
}

impl TokenHierarchyEvent {
    pub(crate) fn new(
        kind: TokenHierarchyEventKind,
        change: Option<TokenChange>,
        modification: Option<TextModification>,
    ) -> Self {
        let (mut start, mut end) = change
            .as_ref()
            .map_or((0, 0), |change| (change.offset(), change.added_end_offset()));
        if let Some(modification) = modification {
            if change.is_none() {
                start = modification.offset;
                end = modification.new_end();
            } else {
                start = start.min(modification.offset);
                end = end.max(modification.new_end());
            }
        }
        TokenHierarchyEvent {
            kind,
            affected_start: start,
            affected_end: end,
            change,
            modification,
        }
    }

    #[inline]
    pub fn kind(&self) -> TokenHierarchyEventKind {
        self.kind
    }

    /// Start of the region whose tokens changed, in the new text.
    #[inline]
    pub fn affected_start_offset(&self) -> usize {
        self.affected_start
    }

    /// End of the region whose tokens changed, in the new text.
    #[inline]
    pub fn affected_end_offset(&self) -> usize {
        self.affected_end
    }

    /// Change of the top-level list, with nested changes of embedded lists.
    #[inline]
    pub fn token_change(&self) -> Option<&TokenChange> {
        self.change.as_ref()
    }

    /// The text edit behind a [`Modification`](TokenHierarchyEventKind::Modification).
    #[inline]
    pub fn modification(&self) -> Option<TextModification> {
        self.modification
    }
}

/// Receiver of hierarchy events.
///
/// Called synchronously on the thread that changed the hierarchy, after the
/// hierarchy's internal lock is released. Closures taking a
/// `&TokenHierarchyEvent` implement this trait.
pub trait TokenHierarchyListener: Send + Sync {
    fn token_hierarchy_changed(&self, event: &TokenHierarchyEvent);
}

impl<F> TokenHierarchyListener for F
where
    F: Fn(&TokenHierarchyEvent) + Send + Sync,
{
    fn token_hierarchy_changed(&self, event: &TokenHierarchyEvent) {
        self(event);
    }
}

/// Handle returned by [`TokenHierarchy::add_listener`](crate::TokenHierarchy::add_listener).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}
