//! Token-list storage.
//!
//! Every list of a hierarchy (the root list, embedded lists and the sections
//! of joined embeddings) lives in one [`ListArena`] owned by the hierarchy
//! state. Lists refer to each other by [`ListId`]; an id carries the slot
//! generation so that handles to freed lists are detected instead of
//! silently reading a recycled slot.
//!
//! Entry offsets are absolute offsets into the hierarchy's current text and
//! are shifted when an edit lands before them.

use smallvec::SmallVec;
use strata_lang::{LanguageEmbedding, LanguagePath, LexerState, PartType, TokenId};

/// Handle of a list in a [`ListArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ListId {
    index: u32,
    generation: u32,
}

/// One embedding of a token, and its list once created.
#[derive(Clone, Debug)]
pub(crate) struct EmbeddingRef {
    pub embedding: LanguageEmbedding,
    /// Installed through `create_embedding` rather than resolved from the
    /// language definition.
    pub custom: bool,
    pub list: Option<ListId>,
}

/// Embeddings of one token. Custom embeddings come first.
#[derive(Clone, Debug, Default)]
pub(crate) struct Embeddings {
    /// The default embedding has been asked for.
    pub resolved: bool,
    pub items: SmallVec<[EmbeddingRef; 1]>,
}

impl Embeddings {
    /// Lists created for these embeddings.
    pub fn lists(&self) -> impl Iterator<Item = ListId> + '_ {
        self.items.iter().filter_map(|item| item.list)
    }
}

/// A token as stored in a list.
#[derive(Clone, Debug)]
pub(crate) struct TokenEntry {
    pub id: TokenId,
    pub offset: usize,
    pub length: usize,
    /// Tokens of this entry are handed out as the language's shared
    /// flyweight instance.
    pub flyweight: bool,
    pub state_before: LexerState,
    /// Exclusive end of the input the lexer examined for this token,
    /// including any skipped tokens that follow it.
    pub lookahead: usize,
    pub part: PartType,
    pub embeddings: Embeddings,
}

impl TokenEntry {
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn shift(&mut self, delta: isize) {
        self.offset = self.offset.saturating_add_signed(delta);
        self.lookahead = self.lookahead.saturating_add_signed(delta);
    }
}

/// A list of tokens covering `start..end` of the text.
#[derive(Debug)]
pub(crate) struct ListNode {
    pub path: LanguagePath,
    pub start: usize,
    pub end: usize,
    pub entries: Vec<TokenEntry>,
    /// Section of a joined embedding; entries are owned by the join group.
    pub join: bool,
    /// Generation of the join group that last assigned the entries of a
    /// section. Zero for other lists.
    pub revision: u64,
}

impl ListNode {
    /// Index of the first entry starting after `offset`.
    pub fn partition(&self, offset: usize) -> usize {
        self.entries.partition_point(|entry| entry.offset <= offset)
    }
}

struct Slot {
    generation: u32,
    node: Option<ListNode>,
}

/// Generational arena of token lists.
#[derive(Default)]
pub(crate) struct ListArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ListArena {
    pub fn alloc(&mut self, node: ListNode) -> ListId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return ListId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len())
            .unwrap_or_else(|_| panic!("token list arena exceeded u32::MAX lists"));
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        ListId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: ListId) -> Option<&ListNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation == id.generation {
            slot.node.as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: ListId) -> Option<&mut ListNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation == id.generation {
            slot.node.as_mut()
        } else {
            None
        }
    }

    pub fn contains(&self, id: ListId) -> bool {
        self.get(id).is_some()
    }

    /// Remove a list, invalidating its id.
    pub fn free(&mut self, id: ListId) -> Option<ListNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    pub fn clear(&mut self) {
        for (slot, index) in self.slots.iter_mut().zip(0u32..) {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
    }

    /// Number of live lists.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
