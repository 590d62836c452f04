//! Strata language model.
//!
//! This crate describes *what* can be lexed, independent of any input:
//! - [`TokenId`]s grouped into a [`Language`], with categories and flyweight
//!   tokens for fixed-text ids
//! - [`LanguagePath`]s naming an embedding context, outermost language first
//! - [`InputAttributes`] scoping configuration values to language paths
//! - The [`Lexer`] service interface a language implements
//!
//! Token hierarchies over concrete inputs live in `strata_tokens`.
//!
//! # Identity
//!
//! Token ids, languages and language paths all compare by identity. They are
//! created once and shared by handle; cloning a handle is a reference-count
//! increment.

mod attributes;
mod category;
mod embedding;
mod error;
mod id_set;
pub mod interner;
mod language;
mod language_path;
mod lexer;
mod registry;
mod slot;
mod token;
mod token_id;

#[cfg(test)]
mod test_support;

pub use attributes::InputAttributes;
pub use category::CategoryList;
pub use embedding::LanguageEmbedding;
pub use error::LanguageError;
pub use id_set::TokenIdSet;
pub use interner::StringInterner;
pub use language::{Language, LanguageDef};
pub use language_path::LanguagePath;
pub use lexer::{LexedToken, Lexer, LexerInput, LexerRestartInfo, LexerState};
pub use registry::LanguageRegistry;
pub use token::{PartType, Token};
pub use token_id::TokenId;
