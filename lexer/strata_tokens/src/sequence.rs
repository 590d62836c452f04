//! Token sequences: cursors over one token list.
//!
//! A sequence is bound to the hierarchy's modification count at the time it
//! was obtained. Any later modification makes every operation fail with
//! [`TokenError::ConcurrentModification`]; obtain a fresh sequence instead.
//!
//! The position is an index in `0..=token_count()` meaning "before the token
//! at index". [`token`](TokenSequence::token) is available only right after a
//! successful move onto a token.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use parking_lot::MutexGuard;
use strata_lang::{Language, LanguageEmbedding, LanguagePath, Token};

use crate::hierarchy::HierarchyShared;
use crate::state::{HierarchyState, Target};
use crate::{TokenError, TokenHierarchyEvent, TokenHierarchyEventKind};

/// Cursor over the tokens of one list, or of a window of it.
#[derive(Clone)]
pub struct TokenSequence {
    shared: Arc<HierarchyShared>,
    target: Target,
    path: LanguagePath,
    expected_mod: u64,
    /// Window of target indices this sequence exposes.
    window: Range<usize>,
    /// Position relative to the window start.
    index: usize,
    current: Option<Token>,
    current_offset: usize,
    /// Tokens follow each other without gaps.
    continuous: bool,
}

impl TokenSequence {
    pub(crate) fn new(
        shared: Arc<HierarchyShared>,
        target: Target,
        path: LanguagePath,
        expected_mod: u64,
        window: Range<usize>,
        continuous: bool,
    ) -> Self {
        TokenSequence {
            shared,
            target,
            path,
            expected_mod,
            window,
            index: 0,
            current: None,
            current_offset: 0,
            continuous,
        }
    }

    /// Lock the hierarchy state, failing if this sequence is stale.
    fn state(&self) -> Result<MutexGuard<'_, HierarchyState>, TokenError> {
        let state = self.shared.state.lock();
        if state.mod_count != self.expected_mod {
            return Err(TokenError::ConcurrentModification);
        }
        state.check_target(&self.target)?;
        Ok(state)
    }

    fn check(&self) -> Result<(), TokenError> {
        self.state().map(drop)
    }

    fn count(&self) -> usize {
        self.window.len()
    }

    fn place(&mut self, index: usize, token: Token, offset: usize) {
        self.index = index;
        self.current = Some(token);
        self.current_offset = offset;
    }

    fn clear_current(&mut self, index: usize) {
        self.index = index;
        self.current = None;
    }

    /// Move to the next token. Returns `false` at the end.
    pub fn move_next(&mut self) -> Result<bool, TokenError> {
        let state = self.state()?;
        let next = if self.current.is_some() {
            self.index + 1
        } else {
            self.index
        };
        if next >= self.count() {
            drop(state);
            self.clear_current(self.count());
            return Ok(false);
        }
        let target_index = self.window.start + next;
        let token = state.view_token(&self.target, target_index)?;
        let offset = match &self.current {
            Some(previous) if self.continuous => self.current_offset + previous.length(),
            _ => state.view_bounds(&self.target, target_index)?.0,
        };
        drop(state);
        self.place(next, token, offset);
        Ok(true)
    }

    /// Move to the previous token. Returns `false` at the start.
    pub fn move_previous(&mut self) -> Result<bool, TokenError> {
        let state = self.state()?;
        if self.index == 0 {
            drop(state);
            self.clear_current(0);
            return Ok(false);
        }
        let previous = self.index - 1;
        let target_index = self.window.start + previous;
        let token = state.view_token(&self.target, target_index)?;
        let offset = state.view_bounds(&self.target, target_index)?.0;
        drop(state);
        self.place(previous, token, offset);
        Ok(true)
    }

    /// Position before the token at `index`; `index == token_count()` is the
    /// end.
    pub fn move_index(&mut self, index: usize) -> Result<(), TokenError> {
        self.check()?;
        if index > self.count() {
            return Err(TokenError::IndexOutOfBounds {
                index,
                count: self.count(),
            });
        }
        self.clear_current(index);
        Ok(())
    }

    /// Position before the first token.
    pub fn move_start(&mut self) -> Result<(), TokenError> {
        self.move_index(0)
    }

    /// Position after the last token.
    pub fn move_end(&mut self) -> Result<(), TokenError> {
        let count = self.count();
        self.move_index(count)
    }

    /// Position before the token containing `offset`.
    ///
    /// Returns `offset` minus the start of that token. An offset in a gap
    /// between tokens positions before the following token and returns a
    /// negative distance; an offset past the last token positions at the end
    /// and returns the distance from the last token's end. Returns `None` for
    /// an empty sequence.
    pub fn move_to(&mut self, offset: usize) -> Result<Option<isize>, TokenError> {
        let state = self.state()?;
        let count = self.count();
        if count == 0 {
            drop(state);
            self.clear_current(0);
            return Ok(None);
        }
        let bounds = |index: usize| state.view_bounds(&self.target, self.window.start + index);

        let (mut low, mut high) = (0, count);
        while low < high {
            let mid = low + (high - low) / 2;
            if bounds(mid)?.0 <= offset {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        let (index, diff) = if low == 0 {
            (0, distance(offset, bounds(0)?.0))
        } else {
            let (start, end) = bounds(low - 1)?;
            if offset < end {
                (low - 1, distance(offset, start))
            } else if low < count {
                (low, distance(offset, bounds(low)?.0))
            } else {
                (count, distance(offset, end))
            }
        };
        drop(state);
        self.clear_current(index);
        Ok(Some(diff))
    }

    /// The current token.
    ///
    /// Tokens of fixed-text ids may be the language's shared flyweight
    /// instance without an offset; see [`offset_token`](Self::offset_token).
    pub fn token(&self) -> Result<Token, TokenError> {
        self.check()?;
        self.current.clone().ok_or(TokenError::NoCurrentToken)
    }

    /// Offset of the current token.
    pub fn offset(&self) -> Result<usize, TokenError> {
        self.check()?;
        if self.current.is_none() {
            return Err(TokenError::NoCurrentToken);
        }
        Ok(self.current_offset)
    }

    /// The current token with its offset, replacing a flyweight in the list
    /// by a positioned instance.
    pub fn offset_token(&mut self) -> Result<Token, TokenError> {
        let mut state = self.state()?;
        let current = self.current.as_ref().ok_or(TokenError::NoCurrentToken)?;
        if !current.is_flyweight() {
            return Ok(current.clone());
        }
        let positioned = current.materialize(self.current_offset);
        if let Some((list, index)) = state.view_location(&self.target, self.window.start + self.index)
        {
            if let Some(entry) = state
                .lists
                .get_mut(list)
                .and_then(|node| node.entries.get_mut(index))
            {
                entry.flyweight = false;
            }
        }
        drop(state);
        self.current = Some(positioned.clone());
        Ok(positioned)
    }

    /// Current position, relative to the start of this sequence.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn token_count(&self) -> Result<usize, TokenError> {
        self.check()?;
        Ok(self.count())
    }

    pub fn is_empty(&self) -> Result<bool, TokenError> {
        Ok(self.token_count()? == 0)
    }

    /// Returns `false` once the hierarchy changed after this sequence was
    /// obtained.
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    #[inline]
    pub fn language(&self) -> &Language {
        self.path.inner_language()
    }

    #[inline]
    pub fn language_path(&self) -> &LanguagePath {
        &self.path
    }

    /// Sequence over the embedded tokens of the current token.
    ///
    /// A custom embedding is preferred over the default one. Returns `None`
    /// if the token has no embedding.
    pub fn embedded(&self) -> Result<Option<TokenSequence>, TokenError> {
        self.embedded_impl(false)
    }

    /// Like [`embedded`](Self::embedded), but for an embedding that joins
    /// sections returns a sequence over the whole joined stream.
    pub fn embedded_joined(&self) -> Result<Option<TokenSequence>, TokenError> {
        self.embedded_impl(true)
    }

    fn embedded_impl(&self, joined: bool) -> Result<Option<TokenSequence>, TokenError> {
        let mut state = self.state()?;
        if self.current.is_none() {
            return Err(TokenError::NoCurrentToken);
        }
        let Some((list, index)) =
            state.view_location(&self.target, self.window.start + self.index)
        else {
            return Ok(None);
        };
        let Some(child) = state.primary_embedded_list(list, index) else {
            return Ok(None);
        };
        let node = state.list(child)?;
        let path = node.path.clone();
        let (target, count, continuous) = if joined && node.join {
            let group = state
                .joins
                .get(&path)
                .ok_or(TokenError::ConcurrentModification)?;
            (
                Target::Joined {
                    path: path.clone(),
                    generation: group.generation,
                },
                group.tokens.len(),
                false,
            )
        } else {
            let count = node.entries.len();
            (state.list_target(child)?, count, true)
        };
        Ok(Some(TokenSequence::new(
            Arc::clone(&self.shared),
            target,
            path,
            self.expected_mod,
            0..count,
            continuous,
        )))
    }

    /// Embed `language` in the current token, skipping `start_skip_length`
    /// leading and `end_skip_length` trailing characters.
    ///
    /// Returns `false` if the token already has an embedding of `language`.
    /// On mutable inputs this requires the document write guard.
    pub fn create_embedding(
        &self,
        language: &Language,
        start_skip_length: usize,
        end_skip_length: usize,
        join_sections: bool,
    ) -> Result<bool, TokenError> {
        self.shared.check_write()?;
        let (change, paths_grew) = {
            let mut state = self.state()?;
            if self.current.is_none() {
                return Err(TokenError::NoCurrentToken);
            }
            let (list, index) = state
                .view_location(&self.target, self.window.start + self.index)
                .ok_or_else(|| TokenError::InvalidEmbedding {
                    reason: "token spans several joined sections".to_owned(),
                })?;
            let paths_before = state.language_paths().len();
            let embedding = LanguageEmbedding::new(
                language.clone(),
                start_skip_length,
                end_skip_length,
                join_sections,
            );
            let Some(change) = state.create_embedding(list, index, embedding)? else {
                return Ok(false);
            };
            (change, state.language_paths().len() > paths_before)
        };
        self.shared.fire(&TokenHierarchyEvent::new(
            TokenHierarchyEventKind::EmbeddingCreated,
            Some(change),
            None,
        ));
        if paths_grew {
            self.shared.fire(&TokenHierarchyEvent::new(
                TokenHierarchyEventKind::LanguagePaths,
                None,
                None,
            ));
        }
        Ok(true)
    }

    /// Remove a custom embedding of `language` from the current token.
    ///
    /// Returns `false` if there is no such custom embedding. Default
    /// embeddings cannot be removed. On mutable inputs this requires the
    /// document write guard.
    pub fn remove_embedding(&self, language: &Language) -> Result<bool, TokenError> {
        self.shared.check_write()?;
        let change = {
            let mut state = self.state()?;
            if self.current.is_none() {
                return Err(TokenError::NoCurrentToken);
            }
            let Some((list, index)) =
                state.view_location(&self.target, self.window.start + self.index)
            else {
                return Ok(false);
            };
            let Some(change) = state.remove_embedding(list, index, language)? else {
                return Ok(false);
            };
            change
        };
        self.shared.fire(&TokenHierarchyEvent::new(
            TokenHierarchyEventKind::EmbeddingRemoved,
            Some(change),
            None,
        ));
        Ok(true)
    }

    /// Sequence over the tokens of this sequence that overlap `start..end`.
    ///
    /// A sub-sequence of a sub-sequence covers the intersection of both
    /// windows.
    pub fn sub_sequence(&self, start: usize, end: usize) -> Result<TokenSequence, TokenError> {
        let state = self.state()?;
        if start > end {
            return Err(TokenError::OffsetOutOfBounds {
                offset: start,
                length: end,
            });
        }
        let window = window_within(&state, &self.target, self.window.clone(), start, end)?;
        drop(state);
        Ok(TokenSequence::new(
            Arc::clone(&self.shared),
            self.target.clone(),
            self.path.clone(),
            self.expected_mod,
            window,
            self.continuous,
        ))
    }
}

/// Target indices within `window` of tokens overlapping `start..end`.
pub(crate) fn window_within(
    state: &HierarchyState,
    target: &Target,
    window: Range<usize>,
    start: usize,
    end: usize,
) -> Result<Range<usize>, TokenError> {
    let mut lo = window.start;
    let mut hi = window.end;
    // First token ending after `start`.
    let (mut low, mut high) = (lo, hi);
    while low < high {
        let mid = low + (high - low) / 2;
        if state.view_bounds(target, mid)?.1 <= start {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    lo = low;
    // First token starting at or after `end`.
    let (mut low, mut high) = (lo, hi);
    while low < high {
        let mid = low + (high - low) / 2;
        if state.view_bounds(target, mid)?.0 < end {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    hi = low;
    Ok(lo..hi)
}

#[expect(
    clippy::cast_possible_wrap,
    reason = "text offsets are far below isize::MAX"
)]
fn distance(offset: usize, from: usize) -> isize {
    offset as isize - from as isize
}

impl fmt::Debug for TokenSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSequence")
            .field("path", &self.path)
            .field("index", &self.index)
            .field("count", &self.count())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
