//! Description of a language embedded inside a token.

use crate::Language;

/// A language embedded in a token, minus `start_skip_length` leading and
/// `end_skip_length` trailing characters of the token (delimiters such as
/// `<!--` and `-->`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageEmbedding {
    language: Language,
    start_skip_length: usize,
    end_skip_length: usize,
    join_sections: bool,
}

impl LanguageEmbedding {
    /// Describe an embedding.
    ///
    /// With `join_sections` all sections of the same language path are lexed
    /// as one continuous stream, so a token may start in one section and end
    /// in another.
    pub fn new(
        language: Language,
        start_skip_length: usize,
        end_skip_length: usize,
        join_sections: bool,
    ) -> Self {
        LanguageEmbedding {
            language,
            start_skip_length,
            end_skip_length,
            join_sections,
        }
    }

    #[inline]
    pub fn language(&self) -> &Language {
        &self.language
    }

    #[inline]
    pub fn start_skip_length(&self) -> usize {
        self.start_skip_length
    }

    #[inline]
    pub fn end_skip_length(&self) -> usize {
        self.end_skip_length
    }

    #[inline]
    pub fn join_sections(&self) -> bool {
        self.join_sections
    }

    /// Returns `true` if a token of `length` leaves room for both skips.
    #[inline]
    pub fn fits(&self, length: usize) -> bool {
        self.start_skip_length + self.end_skip_length <= length
    }
}
