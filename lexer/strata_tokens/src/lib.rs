//! Strata token hierarchies.
//!
//! Given a [`Language`](strata_lang::Language) and an input, a
//! [`TokenHierarchy`] holds the input's tokens at every embedding level:
//! - the root list, lexed from the whole input
//! - embedded lists, created on first access inside tokens whose language
//!   embeds another language
//! - joined streams, where all sections of one embedded language are lexed
//!   as a single stream
//!
//! Tokens are read through [`TokenSequence`] cursors. Edits of a
//! [`Document`] relex incrementally and report what changed as nested
//! [`TokenChange`]s inside [`TokenHierarchyEvent`]s.

mod change;
mod document;
mod error;
mod event;
mod hierarchy;
mod join;
mod lex;
mod list;
mod relex;
mod sequence;
mod sequence_list;
mod state;
#[cfg(test)]
mod test_support;

pub use change::TokenChange;
pub use document::{Document, DocumentBuilder, DocumentRead, DocumentWrite};
pub use error::TokenError;
pub use event::{
    ListenerId, TextModification, TokenHierarchyEvent, TokenHierarchyEventKind,
    TokenHierarchyListener,
};
pub use hierarchy::{TokenHierarchy, TokenHierarchyBuilder};
pub use sequence::TokenSequence;
pub use sequence_list::TokenSequenceList;
