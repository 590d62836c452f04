//! Errors raised by token sequences and hierarchy operations.

/// Usage errors of a [`TokenSequence`](crate::TokenSequence) or
/// [`TokenHierarchy`](crate::TokenHierarchy).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The underlying token list changed after the sequence was obtained.
    #[error("token list was modified after the sequence was obtained")]
    ConcurrentModification,

    /// `token()` and friends were called without a preceding successful move.
    #[error("no current token: move the sequence first")]
    NoCurrentToken,

    #[error("index {index} out of bounds (token count {count})")]
    IndexOutOfBounds { index: usize, count: usize },

    #[error("offset {offset} out of bounds (input length {length})")]
    OffsetOutOfBounds { offset: usize, length: usize },

    #[error("invalid embedding: {reason}")]
    InvalidEmbedding { reason: String },

    /// Embedding changes, relexing or rebuilding of a mutable input were
    /// attempted outside a write guard.
    #[error("changing the tokens of a mutable input requires the document write lock")]
    WriteLockRequired,
}

impl TokenError {
    /// Returns `true` for staleness errors.
    #[inline]
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, TokenError::ConcurrentModification)
    }
}
