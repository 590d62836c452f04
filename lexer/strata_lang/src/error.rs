//! Errors raised while building or querying a [`Language`](crate::Language).

/// Configuration errors (raised once by [`Language::new`](crate::Language::new))
/// and usage errors of the `valid_*` lookup forms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LanguageError {
    #[error("invalid mime type {mime_type:?}: expected exactly one '/'")]
    InvalidMimeType { mime_type: String },

    #[error("language {mime_type} declares no token ids")]
    NoTokenIds { mime_type: &'static str },

    #[error("token id {name} is listed more than once in {mime_type}")]
    DuplicateTokenId {
        mime_type: &'static str,
        name: &'static str,
    },

    #[error("token id name {name:?} is used by two ids in {mime_type}")]
    DuplicateName {
        mime_type: &'static str,
        name: &'static str,
    },

    #[error("ordinal {ordinal} is used by both {first} and {second} in {mime_type}")]
    DuplicateOrdinal {
        mime_type: &'static str,
        ordinal: u32,
        first: &'static str,
        second: &'static str,
    },

    #[error("category {category:?} is declared twice in {mime_type}")]
    DuplicateCategory {
        mime_type: &'static str,
        category: String,
    },

    #[error("category {category:?} of {mime_type} lists {name}, which is not an id of the language")]
    CategoryMemberNotInLanguage {
        mime_type: &'static str,
        category: String,
        name: &'static str,
    },

    #[error("no token id with ordinal {ordinal} in {mime_type}")]
    UnknownOrdinal { mime_type: &'static str, ordinal: u32 },

    #[error("no token id named {name:?} in {mime_type}")]
    UnknownName { mime_type: &'static str, name: String },

    #[error("no token category {category:?} in {mime_type}")]
    UnknownCategory {
        mime_type: &'static str,
        category: String,
    },

    #[error("token id {name} does not belong to {mime_type}")]
    ForeignTokenId {
        mime_type: &'static str,
        name: &'static str,
    },
}
