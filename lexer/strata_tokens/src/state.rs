//! Internal state of one token hierarchy.
//!
//! Everything a hierarchy knows about its input lives in one
//! [`HierarchyState`] behind the hierarchy's mutex: the current text, the
//! modification count, the arena of token lists and the joined groups.
//! Embedded lists are created on first access; the root list is created on
//! first access after activation.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use strata_lang::{
    InputAttributes, Language, LanguageEmbedding, LanguagePath, LexerState, Token, TokenIdSet,
};

use crate::join::JoinGroup;
use crate::lex::LexRun;
use crate::list::{EmbeddingRef, ListArena, ListId, ListNode, TokenEntry};
use crate::{TokenChange, TokenError};

/// Immutable configuration of a hierarchy.
pub(crate) struct HierarchyConfig {
    pub language: Language,
    pub root_path: LanguagePath,
    pub skip_ids: Option<TokenIdSet>,
    pub attributes: Option<Arc<InputAttributes>>,
}

/// What a token sequence iterates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Target {
    List { id: ListId, revision: u64 },
    Joined { path: LanguagePath, generation: u64 },
}

pub(crate) struct HierarchyState {
    pub config: HierarchyConfig,
    pub text: Arc<str>,
    pub active: bool,
    /// Bumped by every edit, relex, rebuild and deactivation.
    pub mod_count: u64,
    pub root: Option<ListId>,
    pub lists: ListArena,
    pub joins: FxHashMap<LanguagePath, JoinGroup>,
    pub next_join_generation: u64,
    /// Paths introduced by custom embeddings.
    pub custom_paths: FxHashSet<LanguagePath>,
}

/// A token with its offset, regardless of flyweight status.
pub(crate) fn positioned_token(entry: &TokenEntry, text: &Arc<str>) -> Token {
    Token::new(
        entry.id.clone(),
        Arc::clone(text),
        entry.offset..entry.end(),
        entry.offset,
    )
    .with_part(entry.part)
}

/// The token a sequence hands out for `entry`.
pub(crate) fn entry_token(path: &LanguagePath, entry: &TokenEntry, text: &Arc<str>) -> Token {
    if entry.flyweight {
        if let Some(token) = path.inner_language().flyweight_token(&entry.id) {
            return token;
        }
    }
    positioned_token(entry, text)
}

impl HierarchyState {
    pub fn new(config: HierarchyConfig, text: Arc<str>, active: bool) -> Self {
        HierarchyState {
            config,
            text,
            active,
            mod_count: 0,
            root: None,
            lists: ListArena::default(),
            joins: FxHashMap::default(),
            next_join_generation: 0,
            custom_paths: FxHashSet::default(),
        }
    }

    /// The root list, lexing the whole input on first use.
    pub fn ensure_root(&mut self) -> ListId {
        if let Some(root) = self.root {
            return root;
        }
        let outcome = LexRun {
            language: &self.config.language,
            path: &self.config.root_path,
            attributes: self.config.attributes.as_deref(),
            skip_ids: self.config.skip_ids.as_ref(),
            text: &self.text,
            start: 0,
            end: self.text.len(),
            state: LexerState::INITIAL,
        }
        .run(|_, _| false);
        tracing::debug!(
            language = self.config.language.mime_type(),
            tokens = outcome.entries.len(),
            "root token list created"
        );
        let root = self.lists.alloc(ListNode {
            path: self.config.root_path.clone(),
            start: 0,
            end: self.text.len(),
            entries: outcome.entries,
            join: false,
            revision: 0,
        });
        self.root = Some(root);
        root
    }

    /// Drop every list and joined group.
    pub fn clear_lists(&mut self) {
        self.root = None;
        self.lists.clear();
        self.joins.clear();
    }

    pub fn list(&self, id: ListId) -> Result<&ListNode, TokenError> {
        self.lists.get(id).ok_or(TokenError::ConcurrentModification)
    }

    /// Tokens of a list, positioned, for change reporting.
    pub fn list_tokens(&self, id: ListId) -> Vec<Token> {
        self.lists.get(id).map_or_else(Vec::new, |list| {
            list.entries
                .iter()
                .map(|entry| positioned_token(entry, &self.text))
                .collect()
        })
    }

    /// Resolve the default embedding of an entry if not done yet.
    pub fn resolve_default(&mut self, list_id: ListId, index: usize) {
        let Some(list) = self.lists.get(list_id) else {
            return;
        };
        let Some(entry) = list.entries.get(index) else {
            return;
        };
        if entry.embeddings.resolved {
            return;
        }
        let token = positioned_token(entry, &self.text);
        let embedding = list
            .path
            .inner_language()
            .embedding(&token, &list.path, self.config.attributes.as_deref())
            .filter(|embedding| embedding.fits(entry.length));

        if let Some(entry) = self
            .lists
            .get_mut(list_id)
            .and_then(|list| list.entries.get_mut(index))
        {
            entry.embeddings.resolved = true;
            if let Some(embedding) = embedding {
                entry.embeddings.items.push(EmbeddingRef {
                    embedding,
                    custom: false,
                    list: None,
                });
            }
        }
    }

    /// The list of embedding `item` of an entry, created and lexed on first
    /// use. Sections of joined embeddings are created empty; their tokens are
    /// assigned when the join group is built.
    pub fn ensure_embedded_list(
        &mut self,
        list_id: ListId,
        index: usize,
        item: usize,
    ) -> Option<ListId> {
        let list = self.lists.get(list_id)?;
        let entry = list.entries.get(index)?;
        let embedding_ref = entry.embeddings.items.get(item)?;
        if let Some(existing) = embedding_ref.list {
            return Some(existing);
        }
        let embedding = embedding_ref.embedding.clone();
        let start = entry.offset + embedding.start_skip_length();
        let end = entry.end() - embedding.end_skip_length();
        let path = list.path.embedded(embedding.language());
        let join = embedding.join_sections();

        let entries = if join {
            Vec::new()
        } else {
            LexRun {
                language: embedding.language(),
                path: &path,
                attributes: self.config.attributes.as_deref(),
                skip_ids: None,
                text: &self.text,
                start,
                end,
                state: LexerState::INITIAL,
            }
            .run(|_, _| false)
            .entries
        };
        tracing::trace!(
            path = path.mime_path(),
            start,
            end,
            join,
            tokens = entries.len(),
            "embedded token list created"
        );

        let child = self.lists.alloc(ListNode {
            path: path.clone(),
            start,
            end,
            entries,
            join,
            revision: 0,
        });
        if let Some(embedding_ref) = self
            .lists
            .get_mut(list_id)
            .and_then(|list| list.entries.get_mut(index))
            .and_then(|entry| entry.embeddings.items.get_mut(item))
        {
            embedding_ref.list = Some(child);
        }
        if join && self.joins.contains_key(&path) {
            self.invalidate_group(&path);
        }
        Some(child)
    }

    /// The list of the preferred embedding of an entry: the first custom
    /// embedding, else the default one.
    pub fn primary_embedded_list(&mut self, list_id: ListId, index: usize) -> Option<ListId> {
        self.resolve_default(list_id, index);
        let child = self.ensure_embedded_list(list_id, index, 0)?;
        let (join, path) = {
            let node = self.lists.get(child)?;
            (node.join, node.path.clone())
        };
        if join {
            self.ensure_group(&path);
        }
        Some(child)
    }

    /// Free a list and every list embedded in it.
    pub fn free_list(&mut self, id: ListId) {
        let Some(node) = self.lists.free(id) else {
            return;
        };
        if node.join {
            self.invalidate_group(&node.path);
        }
        for entry in &node.entries {
            for child in entry.embeddings.lists() {
                self.free_list(child);
            }
        }
    }

    /// Shift a list and everything embedded in it by `delta`.
    pub fn shift_subtree(&mut self, id: ListId, delta: isize) {
        let Some(node) = self.lists.get_mut(id) else {
            return;
        };
        node.start = node.start.saturating_add_signed(delta);
        node.end = node.end.saturating_add_signed(delta);
        let mut children = Vec::new();
        for entry in &mut node.entries {
            entry.shift(delta);
            children.extend(entry.embeddings.lists());
        }
        for child in children {
            self.shift_subtree(child, delta);
        }
    }

    /// Every list with language path `path`, in offset order, creating
    /// embedded lists as needed.
    pub fn lists_of_path(&mut self, path: &LanguagePath) -> Vec<ListId> {
        if *path == self.config.root_path {
            return vec![self.ensure_root()];
        }
        let Some(parent) = path.parent().cloned() else {
            return Vec::new();
        };
        let parents = self.lists_of_path(&parent);
        if parents
            .iter()
            .any(|id| self.lists.get(*id).is_some_and(|list| list.join))
        {
            self.ensure_group(&parent);
        }

        let language = path.inner_language();
        let mut found = Vec::new();
        for parent_id in parents {
            let count = self.lists.get(parent_id).map_or(0, |list| list.entries.len());
            for index in 0..count {
                self.resolve_default(parent_id, index);
                let items: Vec<usize> = self
                    .lists
                    .get(parent_id)
                    .and_then(|list| list.entries.get(index))
                    .map(|entry| {
                        entry
                            .embeddings
                            .items
                            .iter()
                            .enumerate()
                            .filter(|(_, item)| item.embedding.language() == language)
                            .map(|(item, _)| item)
                            .collect()
                    })
                    .unwrap_or_default();
                for item in items {
                    found.extend(self.ensure_embedded_list(parent_id, index, item));
                }
            }
        }
        found.sort_by_key(|id| self.lists.get(*id).map_or(0, |list| list.start));
        found
    }

    /// Statically reachable language paths plus those of custom embeddings.
    pub fn language_paths(&self) -> Vec<LanguagePath> {
        let mut seen: FxHashSet<LanguagePath> = FxHashSet::default();
        let mut pending = vec![self.config.root_path.clone()];
        for custom in &self.custom_paths {
            pending.extend((1..=custom.size()).filter_map(|end| custom.sub_path(0, end)));
        }
        while let Some(path) = pending.pop() {
            if !seen.insert(path.clone()) {
                continue;
            }
            for language in path.inner_language().embedded_languages() {
                if !path.contains(&language) {
                    pending.push(path.embedded(&language));
                }
            }
        }
        let mut paths: Vec<_> = seen.into_iter().collect();
        paths.sort_by_key(LanguagePath::mime_path);
        paths
    }

    /// Install a custom embedding on an entry.
    ///
    /// Returns `None` if the entry already has an embedding of the language.
    /// Otherwise returns the change describing the new embedded tokens.
    pub fn create_embedding(
        &mut self,
        list_id: ListId,
        index: usize,
        embedding: LanguageEmbedding,
    ) -> Result<Option<TokenChange>, TokenError> {
        let list = self.list(list_id)?;
        let entry = list
            .entries
            .get(index)
            .ok_or(TokenError::IndexOutOfBounds {
                index,
                count: list.entries.len(),
            })?;
        if !embedding.fits(entry.length) {
            return Err(TokenError::InvalidEmbedding {
                reason: format!(
                    "skip lengths {} + {} exceed token length {}",
                    embedding.start_skip_length(),
                    embedding.end_skip_length(),
                    entry.length
                ),
            });
        }
        self.resolve_default(list_id, index);

        let list = self.list(list_id)?;
        let parent_path = list.path.clone();
        let Some(entry) = list.entries.get(index) else {
            return Ok(None);
        };
        if entry
            .embeddings
            .items
            .iter()
            .any(|item| item.embedding.language() == embedding.language())
        {
            return Ok(None);
        }
        let position = entry.embeddings.items.iter().filter(|item| item.custom).count();
        let token = positioned_token(entry, &self.text);
        let join = embedding.join_sections();
        if let Some(entry) = self
            .lists
            .get_mut(list_id)
            .and_then(|list| list.entries.get_mut(index))
        {
            entry.embeddings.items.insert(
                position,
                EmbeddingRef {
                    embedding,
                    custom: true,
                    list: None,
                },
            );
        }

        let child = self
            .ensure_embedded_list(list_id, index, position)
            .ok_or(TokenError::ConcurrentModification)?;
        let child_path = self.list(child)?.path.clone();
        if join {
            self.invalidate_group(&child_path);
            self.ensure_group(&child_path);
        }
        self.custom_paths.insert(child_path.clone());
        tracing::debug!(path = child_path.mime_path(), index, "embedding created");

        let child_node = self.list(child)?;
        let added = self.list_tokens(child);
        let mut change = TokenChange::new(
            parent_path,
            index,
            token.offset().unwrap_or_default(),
            vec![token.clone()],
            vec![token],
        );
        change.push_embedded(TokenChange::new(
            child_path,
            0,
            child_node.start,
            Vec::new(),
            added,
        ));
        Ok(Some(change))
    }

    /// Remove the custom embedding of `language` from an entry.
    ///
    /// Returns `None` if the entry has no such custom embedding.
    pub fn remove_embedding(
        &mut self,
        list_id: ListId,
        index: usize,
        language: &Language,
    ) -> Result<Option<TokenChange>, TokenError> {
        let list = self.list(list_id)?;
        let parent_path = list.path.clone();
        let Some(entry) = list.entries.get(index) else {
            return Err(TokenError::IndexOutOfBounds {
                index,
                count: list.entries.len(),
            });
        };
        let Some(position) = entry
            .embeddings
            .items
            .iter()
            .position(|item| item.custom && item.embedding.language() == language)
        else {
            return Ok(None);
        };
        let token = positioned_token(entry, &self.text);
        let start = entry.offset + entry.embeddings.items[position].embedding.start_skip_length();

        let removed_ref = self
            .lists
            .get_mut(list_id)
            .and_then(|list| list.entries.get_mut(index))
            .map(|entry| entry.embeddings.items.remove(position));
        let child_path = parent_path.embedded(language);
        let removed = match removed_ref.and_then(|item| item.list) {
            Some(child) => {
                let tokens = self.list_tokens(child);
                self.free_list(child);
                tokens
            }
            None => Vec::new(),
        };
        tracing::debug!(path = child_path.mime_path(), index, "embedding removed");

        let mut change = TokenChange::new(
            parent_path,
            index,
            token.offset().unwrap_or_default(),
            vec![token.clone()],
            vec![token],
        );
        change.push_embedded(TokenChange::new(child_path, 0, start, removed, Vec::new()));
        Ok(Some(change))
    }

    /// Target of a sequence over list `id` as it is now.
    pub fn list_target(&self, id: ListId) -> Result<Target, TokenError> {
        let list = self.list(id)?;
        Ok(Target::List {
            id,
            revision: list.revision,
        })
    }

    /// Fail if `target` no longer exists.
    pub fn check_target(&self, target: &Target) -> Result<(), TokenError> {
        let alive = match target {
            Target::List { id, revision } => self
                .lists
                .get(*id)
                .is_some_and(|list| list.revision == *revision),
            Target::Joined { path, generation } => self
                .joins
                .get(path)
                .is_some_and(|group| group.generation == *generation),
        };
        if alive {
            Ok(())
        } else {
            Err(TokenError::ConcurrentModification)
        }
    }

    /// Token at `index` of a target, as handed out by sequences.
    pub fn view_token(&self, target: &Target, index: usize) -> Result<Token, TokenError> {
        match target {
            Target::List { id, .. } => {
                let list = self.list(*id)?;
                let entry = list.entries.get(index).ok_or(TokenError::IndexOutOfBounds {
                    index,
                    count: list.entries.len(),
                })?;
                Ok(entry_token(&list.path, entry, &self.text))
            }
            Target::Joined { path, .. } => self.joined_token(path, index, &self.text),
        }
    }

    /// Start and end offset of the token at `index` of a target.
    pub fn view_bounds(&self, target: &Target, index: usize) -> Result<(usize, usize), TokenError> {
        match target {
            Target::List { id, .. } => {
                let list = self.list(*id)?;
                list.entries
                    .get(index)
                    .map(|entry| (entry.offset, entry.end()))
                    .ok_or(TokenError::IndexOutOfBounds {
                        index,
                        count: list.entries.len(),
                    })
            }
            Target::Joined { path, .. } => self.joined_bounds(path, index),
        }
    }

    /// The list entry backing the token at `index` of a target.
    ///
    /// Joined tokens made of several parts have no single backing entry.
    pub fn view_location(&self, target: &Target, index: usize) -> Option<(ListId, usize)> {
        match target {
            Target::List { id, .. } => Some((*id, index)),
            Target::Joined { path, .. } => {
                let token = self.joins.get(path)?.tokens.get(index)?;
                match token.parts.as_slice() {
                    [single] => Some(*single),
                    _ => None,
                }
            }
        }
    }
}
