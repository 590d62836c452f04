//! Incremental relexing after a text modification.
//!
//! For each affected list the lexer restarts at the first token whose
//! lookahead could have seen the modified text, using the lexer state
//! recorded before that token. It lexes until a new token starts where an
//! old token (shifted past the edit) started, in the same lexer state; from
//! there on the old tokens are kept and only shifted.
//!
//! When a single token is replaced by one of the same id and the edit lies
//! inside the token's embedded region, its embedded lists are kept and
//! relexed the same way, producing nested changes. All other embedded lists
//! of replaced tokens are dropped and recreated on demand.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use strata_lang::{LanguagePath, LexerState, Token};

use crate::lex::LexRun;
use crate::list::{EmbeddingRef, Embeddings, ListId, TokenEntry};
use crate::state::{positioned_token, HierarchyState};
use crate::{TextModification, TokenChange};

struct EditContext {
    old_text: Arc<str>,
    modification: TextModification,
    /// Joined streams as they were before the edit.
    old_joined: FxHashMap<LanguagePath, Vec<Token>>,
}

impl HierarchyState {
    /// Replace the text and update every list.
    ///
    /// Returns the change of the root list, or `None` if the hierarchy has
    /// not been lexed.
    #[tracing::instrument(level = "debug", skip_all, fields(
        offset = modification.offset,
        removed = modification.removed_length,
        inserted = modification.inserted_length,
    ))]
    pub fn apply_modification(
        &mut self,
        text: Arc<str>,
        modification: TextModification,
    ) -> Option<TokenChange> {
        let old_text = std::mem::replace(&mut self.text, text);
        self.mod_count += 1;
        let root = self.root?;
        if modification.is_empty() {
            return None;
        }

        let old_joined = self
            .joins
            .keys()
            .map(|path| (path.clone(), self.joined_tokens(path, &old_text)))
            .collect();
        let mut context = EditContext {
            old_text,
            modification,
            old_joined,
        };
        self.relex_list(root, &mut context)
    }

    /// Relex `start..end` of the unchanged text.
    pub fn relex_region(&mut self, start: usize, end: usize) -> Option<TokenChange> {
        let text = Arc::clone(&self.text);
        let length = end - start;
        self.apply_modification(text, TextModification::new(start, length, length))
    }

    /// Relex the whole input, dropping every embedded list.
    pub fn rebuild(&mut self) -> Option<TokenChange> {
        self.mod_count += 1;
        let root = self.root?;
        let removed = self.list_tokens(root);
        self.clear_lists();
        let root = self.ensure_root();
        let added = self.list_tokens(root);
        Some(TokenChange::new(
            self.config.root_path.clone(),
            0,
            0,
            removed,
            added,
        ))
    }

    /// Drop every list; returns the removed root tokens as a change.
    pub fn deactivate(&mut self) -> Option<TokenChange> {
        self.active = false;
        self.mod_count += 1;
        let root = self.root?;
        let removed = self.list_tokens(root);
        self.clear_lists();
        Some(TokenChange::new(
            self.config.root_path.clone(),
            0,
            0,
            removed,
            Vec::new(),
        ))
    }

    fn relex_list(&mut self, id: ListId, context: &mut EditContext) -> Option<TokenChange> {
        let edit = context.modification;
        let delta = edit.delta();

        let (first, converged_at, outcome, path) = {
            let list = self.lists.get(id)?;
            let entries = &list.entries;
            let new_end = list.end.saturating_add_signed(delta);

            let mut first = list.partition(edit.offset).saturating_sub(1);
            while first > 0 && entries[first - 1].lookahead > edit.offset {
                first -= 1;
            }
            let (start, state) = match entries.get(first) {
                Some(entry) if first > 0 => (entry.offset, entry.state_before),
                _ => (list.start, LexerState::INITIAL),
            };
            let is_root = Some(id) == self.root;

            let threshold = edit.new_end();
            let mut old_index = first;
            let outcome = LexRun {
                language: list.path.inner_language(),
                path: &list.path,
                attributes: self.config.attributes.as_deref(),
                skip_ids: self.config.skip_ids.as_ref().filter(|_| is_root),
                text: &self.text,
                start,
                end: new_end,
                state,
            }
            .run(|pos, state| {
                if pos < threshold {
                    return false;
                }
                let old_pos = pos.saturating_add_signed(-delta);
                while old_index < entries.len() && entries[old_index].offset < old_pos {
                    old_index += 1;
                }
                entries
                    .get(old_index)
                    .is_some_and(|old| old.offset == old_pos && old.state_before == state)
            });
            let converged_at = if outcome.converged {
                old_index
            } else {
                entries.len()
            };
            (first, converged_at, outcome, list.path.clone())
        };

        let added_count = outcome.entries.len();
        let tail = first + added_count;
        let (removed, tail_children) = {
            let list = self.lists.get_mut(id)?;
            list.end = list.end.saturating_add_signed(delta);
            if let (Some(lookahead), Some(previous)) = (
                outcome.leading_skip_lookahead,
                first.checked_sub(1).and_then(|i| list.entries.get_mut(i)),
            ) {
                previous.lookahead = previous.lookahead.max(lookahead);
            }
            let removed: Vec<TokenEntry> = list
                .entries
                .splice(first..converged_at, outcome.entries)
                .collect();
            let mut tail_children = Vec::new();
            for entry in &mut list.entries[tail..] {
                entry.shift(delta);
                tail_children.extend(entry.embeddings.lists());
            }
            (removed, tail_children)
        };
        for child in tail_children {
            self.shift_subtree(child, delta);
        }

        let removed_tokens: Vec<Token> = removed
            .iter()
            .map(|entry| positioned_token(entry, &context.old_text))
            .collect();
        let added_tokens: Vec<Token> = self.lists.get(id).map_or_else(Vec::new, |list| {
            list.entries[first..tail]
                .iter()
                .map(|entry| positioned_token(entry, &self.text))
                .collect()
        });
        let offset = removed_tokens
            .first()
            .into_iter()
            .chain(added_tokens.first())
            .filter_map(Token::offset)
            .min()
            .unwrap_or_else(|| self.lists.get(id).map_or(0, |list| list.start));
        tracing::debug!(
            path = path.mime_path(),
            restart = first,
            removed = removed_tokens.len(),
            added = added_tokens.len(),
            "token list relexed"
        );
        let mut change = TokenChange::new(path.clone(), first, offset, removed_tokens, added_tokens);

        if change.is_bounds_change() {
            let mut dirty_joins = SmallVec::<[LanguagePath; 1]>::new();
            if let Some(old) = removed.into_iter().next() {
                self.retain_embeddings(id, first, old, context, &mut change, &mut dirty_joins);
            }
            for join_path in dirty_joins {
                let old = context.old_joined.remove(&join_path);
                if let Some(nested) = self.rejoin(&join_path, old, delta) {
                    change.push_embedded(nested);
                }
            }
        } else {
            for entry in &removed {
                for child in entry.embeddings.lists() {
                    self.free_list(child);
                }
            }
            // Tokens with joined embeddings may have come or gone.
            let under: Vec<LanguagePath> = self
                .joins
                .keys()
                .filter(|join| join.parent() == Some(&path))
                .cloned()
                .collect();
            for join in under {
                self.invalidate_group(&join);
            }
        }
        Some(change)
    }

    /// Move the embeddings of the replaced token `old` to its replacement at
    /// `index`, relexing lists the edit falls into and dropping the rest.
    fn retain_embeddings(
        &mut self,
        id: ListId,
        index: usize,
        old: TokenEntry,
        context: &mut EditContext,
        change: &mut TokenChange,
        dirty_joins: &mut SmallVec<[LanguagePath; 1]>,
    ) {
        let edit = context.modification;
        let Some((token, new_offset, new_length, path)) = self.lists.get(id).and_then(|list| {
            let entry = list.entries.get(index)?;
            Some((
                positioned_token(entry, &self.text),
                entry.offset,
                entry.length,
                list.path.clone(),
            ))
        }) else {
            return;
        };
        let default = if old.embeddings.resolved {
            path.inner_language()
                .embedding(&token, &path, self.config.attributes.as_deref())
                .filter(|embedding| embedding.fits(new_length))
        } else {
            None
        };

        let old_end = old.end();
        let mut kept: SmallVec<[EmbeddingRef; 1]> = SmallVec::new();
        let mut default_kept = false;
        for mut item in old.embeddings.items {
            let keep = if item.custom {
                item.embedding.fits(new_length)
            } else {
                default.as_ref() == Some(&item.embedding)
            };
            if !keep {
                if let Some(child) = item.list {
                    self.free_list(child);
                }
                continue;
            }
            default_kept |= !item.custom;

            if let Some(child) = item.list {
                let start_skip = item.embedding.start_skip_length();
                let end_skip = item.embedding.end_skip_length();
                let inside = edit.offset >= old.offset + start_skip
                    && edit.old_end() + end_skip <= old_end;
                if !inside {
                    self.free_list(child);
                    item.list = None;
                } else if item.embedding.join_sections() {
                    if let Some(node) = self.lists.get_mut(child) {
                        node.end = new_offset + new_length - end_skip;
                        if !dirty_joins.contains(&node.path) {
                            dirty_joins.push(node.path.clone());
                        }
                    }
                } else if let Some(nested) = self.relex_list(child, context) {
                    change.push_embedded(nested);
                }
            }
            kept.push(item);
        }
        if !default_kept {
            kept.extend(default.map(|embedding| EmbeddingRef {
                embedding,
                custom: false,
                list: None,
            }));
        }

        if let Some(entry) = self
            .lists
            .get_mut(id)
            .and_then(|list| list.entries.get_mut(index))
        {
            entry.embeddings = Embeddings {
                resolved: old.embeddings.resolved,
                items: kept,
            };
        }
    }
}
