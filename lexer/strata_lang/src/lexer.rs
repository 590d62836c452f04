//! Lexer service interface implemented by language definitions.
//!
//! A [`Lexer`] pulls characters from a [`LexerInput`] and returns one
//! [`LexedToken`] per call. The input records how far the lexer read past
//! the end of each token; together with [`Lexer::state`] this is what lets a
//! token hierarchy restart lexing in the middle of the text after an edit.

use crate::{InputAttributes, LanguagePath, TokenId};

/// Opaque lexer state between two tokens.
///
/// Lexers that need no state between tokens always report
/// [`LexerState::INITIAL`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LexerState(u32);

impl LexerState {
    pub const INITIAL: LexerState = LexerState(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        LexerState(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Information handed to [`LanguageDef::create_lexer`](crate::LanguageDef::create_lexer).
#[derive(Clone, Copy)]
pub struct LexerRestartInfo<'a> {
    /// State the lexer must resume in.
    pub state: LexerState,
    /// Embedding context of the text being lexed.
    pub language_path: &'a LanguagePath,
    /// Input attributes of the hierarchy, if any.
    pub attributes: Option<&'a InputAttributes>,
}

/// A lexer for one language.
pub trait Lexer {
    /// Produce the next token, or `None` once the input is exhausted.
    ///
    /// Every returned token must be non-empty, and `None` may only be
    /// returned when all input has been consumed.
    fn next_token(&mut self, input: &mut LexerInput<'_>) -> Option<LexedToken>;

    /// State after the most recently returned token.
    fn state(&self) -> LexerState {
        LexerState::INITIAL
    }
}

/// A token produced by a lexer, before it is placed in a token list.
#[derive(Clone, Debug)]
pub struct LexedToken {
    id: TokenId,
    length: usize,
    lookahead_end: usize,
}

impl LexedToken {
    #[inline]
    pub fn id(&self) -> &TokenId {
        &self.id
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Exclusive end of the input the lexer examined to produce this token.
    ///
    /// Reaching the end of input counts as examining one position past it.
    #[inline]
    pub fn lookahead_end(&self) -> usize {
        self.lookahead_end
    }
}

/// Character source for a [`Lexer`].
///
/// Positions are byte offsets into the text being lexed.
pub struct LexerInput<'a> {
    text: &'a str,
    token_start: usize,
    pos: usize,
    read_end: usize,
}

impl<'a> LexerInput<'a> {
    /// Start reading `text` at byte offset `start`.
    pub fn new(text: &'a str, start: usize) -> Self {
        debug_assert!(text.is_char_boundary(start));
        LexerInput {
            text,
            token_start: start,
            pos: start,
            read_end: start,
        }
    }

    /// Read the next character.
    ///
    /// At the end of input returns `None` without consuming anything, so no
    /// backup is needed after hitting the end.
    pub fn read(&mut self) -> Option<char> {
        match self.text[self.pos..].chars().next() {
            Some(ch) => {
                self.pos += ch.len_utf8();
                self.read_end = self.read_end.max(self.pos);
                Some(ch)
            }
            None => {
                self.read_end = self.read_end.max(self.text.len() + 1);
                None
            }
        }
    }

    /// Un-read up to `count` characters of the current token.
    pub fn backup(&mut self, count: usize) {
        for _ in 0..count {
            if self.pos <= self.token_start {
                break;
            }
            let prev = self.text[self.token_start..self.pos]
                .chars()
                .next_back()
                .map_or(0, char::len_utf8);
            self.pos -= prev;
        }
    }

    /// Bytes read for the current token so far.
    #[inline]
    pub fn read_length(&self) -> usize {
        self.pos - self.token_start
    }

    /// Text read for the current token so far.
    #[inline]
    pub fn read_text(&self) -> &'a str {
        &self.text[self.token_start..self.pos]
    }

    /// Offset where the current token starts.
    #[inline]
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Returns `true` once every character has been consumed.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Finish the current token with the characters read so far.
    pub fn token(&mut self, id: TokenId) -> LexedToken {
        let token = LexedToken {
            id,
            length: self.read_length(),
            lookahead_end: self.read_end.max(self.pos),
        };
        self.token_start = self.pos;
        self.read_end = self.pos;
        token
    }
}
