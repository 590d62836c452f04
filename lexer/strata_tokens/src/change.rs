//! Token changes: what one edit did to one token list.

use strata_lang::{Language, LanguagePath, Token};

/// Description of the tokens replaced in one token list.
///
/// Tokens `index..index + removed_token_count()` of the old list were
/// replaced by the added tokens. Changes of embedded lists retained across
/// the edit are nested in [`embedded_changes`](Self::embedded_changes).
#[derive(Clone, Debug)]
pub struct TokenChange {
    path: LanguagePath,
    index: usize,
    offset: usize,
    removed: Vec<Token>,
    added: Vec<Token>,
    bounds_change: bool,
    embedded: Vec<TokenChange>,
}

impl TokenChange {
    pub(crate) fn new(
        path: LanguagePath,
        index: usize,
        offset: usize,
        removed: Vec<Token>,
        added: Vec<Token>,
    ) -> Self {
        let bounds_change = matches!(
            (removed.as_slice(), added.as_slice()),
            ([old], [new]) if old.id() == new.id()
        );
        TokenChange {
            path,
            index,
            offset,
            removed,
            added,
            bounds_change,
            embedded: Vec::new(),
        }
    }

    pub(crate) fn push_embedded(&mut self, change: TokenChange) {
        self.embedded.push(change);
    }

    #[inline]
    pub fn language_path(&self) -> &LanguagePath {
        &self.path
    }

    #[inline]
    pub fn language(&self) -> &Language {
        self.path.inner_language()
    }

    /// Index of the first removed (and first added) token.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Offset of the first removed (and first added) token.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Removed tokens, positioned in the old text.
    #[inline]
    pub fn removed_tokens(&self) -> &[Token] {
        &self.removed
    }

    /// Added tokens, positioned in the new text.
    #[inline]
    pub fn added_tokens(&self) -> &[Token] {
        &self.added
    }

    #[inline]
    pub fn removed_token_count(&self) -> usize {
        self.removed.len()
    }

    #[inline]
    pub fn added_token_count(&self) -> usize {
        self.added.len()
    }

    /// End offset of the added tokens in the new text.
    pub fn added_end_offset(&self) -> usize {
        self.added
            .last()
            .and_then(Token::end_offset)
            .unwrap_or(self.offset)
    }

    /// Returns `true` if exactly one token was replaced by one token of the
    /// same id, i.e. only the bounds of a token changed.
    #[inline]
    pub fn is_bounds_change(&self) -> bool {
        self.bounds_change
    }

    #[inline]
    pub fn embedded_changes(&self) -> &[TokenChange] {
        &self.embedded
    }

    #[inline]
    pub fn embedded_change_count(&self) -> usize {
        self.embedded.len()
    }
}
