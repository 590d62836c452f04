//! Joined embeddings.
//!
//! Sections of an embedding that joins sections are lexed as one continuous
//! stream: the regions of every section with the same language path are
//! concatenated in offset order and handed to one lexer. Tokens of that
//! stream are then cut at section boundaries. Each section list stores its
//! pieces, tagged [`PartType::Start`], [`PartType::Middle`] or
//! [`PartType::End`] when the token continues in another section, and the
//! [`JoinGroup`] maps every logical token back to its parts.

use std::sync::Arc;

use smallvec::SmallVec;
use strata_lang::{LanguagePath, LexerState, PartType, Token, TokenId};

use crate::lex::LexRun;
use crate::list::{Embeddings, ListId, TokenEntry};
use crate::state::{entry_token, positioned_token, HierarchyState};
use crate::{TokenChange, TokenError};

/// Logical token of a joined stream.
#[derive(Clone, Debug)]
pub(crate) struct JoinedToken {
    pub id: TokenId,
    /// Section list and entry index of every part, in order.
    pub parts: SmallVec<[(ListId, usize); 2]>,
}

/// The joined stream of one language path.
#[derive(Debug)]
pub(crate) struct JoinGroup {
    pub generation: u64,
    pub tokens: Vec<JoinedToken>,
}

/// A section region inside the concatenated text.
struct Segment {
    list: ListId,
    joined_start: usize,
    start: usize,
    len: usize,
}

impl HierarchyState {
    /// Build the join group of `path` unless it is current.
    pub fn ensure_group(&mut self, path: &LanguagePath) {
        if self.joins.contains_key(path) {
            return;
        }
        let sections: Vec<ListId> = self
            .lists_of_path(path)
            .into_iter()
            .filter(|id| self.lists.get(*id).is_some_and(|list| list.join))
            .collect();
        self.build_group(path, sections);
    }

    /// Forget the join group of `path`; it is rebuilt on next access.
    pub fn invalidate_group(&mut self, path: &LanguagePath) {
        if self.joins.remove(path).is_some() {
            tracing::trace!(path = path.mime_path(), "join group invalidated");
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = path.mime_path()))]
    fn build_group(&mut self, path: &LanguagePath, sections: Vec<ListId>) {
        let mut joined = String::new();
        let mut segments = Vec::with_capacity(sections.len());
        for &list in &sections {
            let Some(node) = self.lists.get(list) else {
                continue;
            };
            segments.push(Segment {
                list,
                joined_start: joined.len(),
                start: node.start,
                len: node.end - node.start,
            });
            joined.push_str(&self.text[node.start..node.end]);
        }

        let language = path.inner_language();
        let lexed = LexRun {
            language,
            path,
            attributes: self.config.attributes.as_deref(),
            skip_ids: None,
            text: &joined,
            start: 0,
            end: joined.len(),
            state: LexerState::INITIAL,
        }
        .run(|_, _| false)
        .entries;

        // Old section entries may carry embedded lists of their own.
        let stale: Vec<ListId> = sections
            .iter()
            .filter_map(|id| self.lists.get(*id))
            .flat_map(|node| node.entries.iter().flat_map(|e| e.embeddings.lists()))
            .collect();
        for list in stale {
            self.free_list(list);
        }
        let mut section_entries: Vec<Vec<TokenEntry>> = vec![Vec::new(); segments.len()];

        let mut tokens = Vec::with_capacity(lexed.len());
        let mut first_segment = 0;
        for lexed_entry in lexed {
            let (start, end) = (lexed_entry.offset, lexed_entry.end());
            while first_segment < segments.len()
                && segments[first_segment].joined_start + segments[first_segment].len <= start
            {
                first_segment += 1;
            }
            let overlapping: Vec<usize> = (first_segment..segments.len())
                .take_while(|&s| segments[s].joined_start < end)
                .filter(|&s| segments[s].len > 0)
                .collect();

            let mut parts = SmallVec::new();
            let last = overlapping.len().saturating_sub(1);
            for (position, &s) in overlapping.iter().enumerate() {
                let segment = &segments[s];
                let piece_start = start.max(segment.joined_start);
                let piece_end = end.min(segment.joined_start + segment.len);
                let part = match (overlapping.len(), position) {
                    (1, _) => PartType::Complete,
                    (_, 0) => PartType::Start,
                    (_, p) if p == last => PartType::End,
                    _ => PartType::Middle,
                };
                let offset = segment.start + (piece_start - segment.joined_start);
                let entries = &mut section_entries[s];
                parts.push((segment.list, entries.len()));
                entries.push(TokenEntry {
                    id: lexed_entry.id.clone(),
                    offset,
                    length: piece_end - piece_start,
                    flyweight: lexed_entry.flyweight && part == PartType::Complete,
                    state_before: lexed_entry.state_before,
                    lookahead: offset + (piece_end - piece_start),
                    part,
                    embeddings: Embeddings::default(),
                });
            }
            tokens.push(JoinedToken {
                id: lexed_entry.id,
                parts,
            });
        }

        self.next_join_generation += 1;
        for (segment, entries) in segments.iter().zip(section_entries) {
            if let Some(node) = self.lists.get_mut(segment.list) {
                node.entries = entries;
                node.revision = self.next_join_generation;
            }
        }
        tracing::debug!(
            sections = sections.len(),
            tokens = tokens.len(),
            "join group built"
        );
        self.joins.insert(
            path.clone(),
            JoinGroup {
                generation: self.next_join_generation,
                tokens,
            },
        );
    }

    fn part_tokens(&self, token: &JoinedToken, text: &Arc<str>, positioned: bool) -> Vec<Token> {
        token
            .parts
            .iter()
            .filter_map(|&(list, index)| {
                let node = self.lists.get(list)?;
                let entry = node.entries.get(index)?;
                Some(if positioned {
                    positioned_token(entry, text)
                } else {
                    entry_token(&node.path, entry, text)
                })
            })
            .collect()
    }

    /// Logical token `index` of the joined stream of `path`.
    pub fn joined_token(
        &self,
        path: &LanguagePath,
        index: usize,
        text: &Arc<str>,
    ) -> Result<Token, TokenError> {
        let group = self.joins.get(path).ok_or(TokenError::ConcurrentModification)?;
        let token = group.tokens.get(index).ok_or(TokenError::IndexOutOfBounds {
            index,
            count: group.tokens.len(),
        })?;
        let mut parts = self.part_tokens(token, text, token.parts.len() > 1);
        if parts.len() == 1 {
            return parts.pop().ok_or(TokenError::ConcurrentModification);
        }
        Ok(Token::joined(token.id.clone(), parts))
    }

    /// Start of the first part and end of the last part of a joined token.
    pub fn joined_bounds(
        &self,
        path: &LanguagePath,
        index: usize,
    ) -> Result<(usize, usize), TokenError> {
        let group = self.joins.get(path).ok_or(TokenError::ConcurrentModification)?;
        let token = group.tokens.get(index).ok_or(TokenError::IndexOutOfBounds {
            index,
            count: group.tokens.len(),
        })?;
        let entry = |&(list, index): &(ListId, usize)| {
            self.lists
                .get(list)
                .and_then(|node| node.entries.get(index))
        };
        let first = token.parts.first().and_then(entry);
        let last = token.parts.last().and_then(entry);
        match (first, last) {
            (Some(first), Some(last)) => Ok((first.offset, last.end())),
            _ => Err(TokenError::ConcurrentModification),
        }
    }

    /// Every logical token of the joined stream of `path`, positioned in
    /// `text`.
    pub fn joined_tokens(&self, path: &LanguagePath, text: &Arc<str>) -> Vec<Token> {
        let Some(group) = self.joins.get(path) else {
            return Vec::new();
        };
        group
            .tokens
            .iter()
            .map(|token| {
                let mut parts = self.part_tokens(token, text, true);
                if parts.len() == 1 {
                    parts.remove(0)
                } else {
                    Token::joined(token.id.clone(), parts)
                }
            })
            .collect()
    }

    /// Rebuild the group of `path` after one of its sections changed and
    /// describe the difference as a change of the joined stream.
    pub fn rejoin(
        &mut self,
        path: &LanguagePath,
        old: Option<Vec<Token>>,
        delta: isize,
    ) -> Option<TokenChange> {
        self.invalidate_group(path);
        self.ensure_group(path);
        let old = old?;
        let text = Arc::clone(&self.text);
        let new = self.joined_tokens(path, &text);
        diff_tokens(path, old, new, delta)
    }
}

fn same_token(old: &Token, new: &Token, delta: isize) -> bool {
    old.id() == new.id()
        && old.text() == new.text()
        && old.offset().map(|offset| offset.saturating_add_signed(delta)) == new.offset()
}

/// Describe `old` → `new` as one change replacing the differing middle.
///
/// Leading tokens are compared in place, trailing tokens shifted by `delta`.
pub(crate) fn diff_tokens(
    path: &LanguagePath,
    mut old: Vec<Token>,
    mut new: Vec<Token>,
    delta: isize,
) -> Option<TokenChange> {
    let prefix = old
        .iter()
        .zip(&new)
        .take_while(|(o, n)| same_token(o, n, 0))
        .count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(o, n)| same_token(o, n, delta))
        .count();
    if prefix == old.len() && prefix == new.len() {
        return None;
    }
    old.truncate(old.len() - suffix);
    new.truncate(new.len() - suffix);
    let removed = old.split_off(prefix);
    let added = new.split_off(prefix);
    let offset = added
        .first()
        .or(removed.first())
        .and_then(Token::offset)
        .unwrap_or_default();
    Some(TokenChange::new(path.clone(), prefix, offset, removed, added))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

    use super::*;
    use crate::test_support::words;

    fn tokens(language: &strata_lang::Language, text: &str) -> Vec<Token> {
        let source: Arc<str> = Arc::from(text);
        let word = language.token_id_by_name("WORD").unwrap().clone();
        let mut offset = 0;
        text.split_inclusive(' ')
            .map(|piece| {
                let range = offset..offset + piece.len();
                let token = Token::new(word.clone(), Arc::clone(&source), range, offset);
                offset += piece.len();
                token
            })
            .collect()
    }

    #[test]
    fn identical_streams_have_no_change() {
        let language = words();
        let path = LanguagePath::get(&language);
        let old = tokens(&language, "a b c");
        let new = tokens(&language, "a b c");
        assert!(diff_tokens(&path, old, new, 0).is_none());
    }

    #[test]
    fn change_covers_only_the_differing_middle() {
        let language = words();
        let path = LanguagePath::get(&language);
        let old = tokens(&language, "a b c");
        let new = tokens(&language, "a bxx c");

        let change = diff_tokens(&path, old, new, 2).unwrap();
        assert_eq!(change.index(), 1);
        assert_eq!(change.offset(), 2);
        assert_eq!(change.removed_tokens()[0].text(), "b ");
        assert_eq!(change.added_tokens()[0].text(), "bxx ");
        assert!(change.is_bounds_change());
    }

    #[test]
    fn shifted_suffix_is_kept_out_of_the_change() {
        let language = words();
        let path = LanguagePath::get(&language);
        let old = tokens(&language, "a b");
        let new = tokens(&language, "xa b");

        let change = diff_tokens(&path, old, new, 1).unwrap();
        assert_eq!(change.index(), 0);
        assert_eq!(change.removed_token_count(), 1);
        assert_eq!(change.added_token_count(), 1);
    }
}
