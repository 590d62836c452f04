//! Sequences over every list of one language path.

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use strata_lang::LanguagePath;

use crate::hierarchy::HierarchyShared;
use crate::list::ListId;
use crate::sequence::window_within;
use crate::{TokenError, TokenSequence};

/// Read-only collection of the token lists of one language path that
/// overlap a region, in offset order.
///
/// The lists are collected on first access and each sequence is created on
/// demand, clipped to the region.
pub struct TokenSequenceList {
    shared: Arc<HierarchyShared>,
    path: LanguagePath,
    start: usize,
    end: usize,
    expected_mod: u64,
    lists: OnceCell<Vec<ListId>>,
}

impl TokenSequenceList {
    pub(crate) fn new(
        shared: Arc<HierarchyShared>,
        path: LanguagePath,
        start: usize,
        end: usize,
        expected_mod: u64,
    ) -> Self {
        TokenSequenceList {
            shared,
            path,
            start,
            end,
            expected_mod,
            lists: OnceCell::new(),
        }
    }

    #[inline]
    pub fn language_path(&self) -> &LanguagePath {
        &self.path
    }

    fn lists(&self) -> Result<&[ListId], TokenError> {
        let mut state = self.shared.state.lock();
        if state.mod_count != self.expected_mod {
            return Err(TokenError::ConcurrentModification);
        }
        if let Some(lists) = self.lists.get() {
            return Ok(lists);
        }
        let (start, end) = (self.start, self.end);
        let lists: Vec<ListId> = state
            .lists_of_path(&self.path)
            .into_iter()
            .filter(|id| {
                state.lists.get(*id).is_some_and(|list| {
                    let overlaps = list.start < end && start < list.end;
                    let touches = start == end && (list.start..=list.end).contains(&start);
                    overlaps || touches
                })
            })
            .collect();
        drop(state);
        Ok(self.lists.get_or_init(|| lists))
    }

    /// Number of lists.
    pub fn len(&self) -> Result<usize, TokenError> {
        Ok(self.lists()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, TokenError> {
        Ok(self.len()? == 0)
    }

    /// Sequence over list `index`, clipped to the region.
    pub fn get(&self, index: usize) -> Result<TokenSequence, TokenError> {
        let lists = self.lists()?;
        let id = *lists.get(index).ok_or(TokenError::IndexOutOfBounds {
            index,
            count: lists.len(),
        })?;
        let mut state = self.shared.state.lock();
        if state.mod_count != self.expected_mod {
            return Err(TokenError::ConcurrentModification);
        }
        if state.list(id)?.join {
            state.ensure_group(&self.path);
        }
        let target = state.list_target(id)?;
        let list = state.list(id)?;
        let path = list.path.clone();
        let window = window_within(&state, &target, 0..list.entries.len(), self.start, self.end)?;
        drop(state);
        Ok(TokenSequence::new(
            Arc::clone(&self.shared),
            target,
            path,
            self.expected_mod,
            window,
            true,
        ))
    }

    /// Sequences in offset order.
    pub fn iter(&self) -> impl Iterator<Item = Result<TokenSequence, TokenError>> + '_ {
        let count = self.len().unwrap_or(0);
        (0..count).map(|index| self.get(index))
    }
}

impl fmt::Debug for TokenSequenceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSequenceList")
            .field("path", &self.path)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}
