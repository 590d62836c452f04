//! Minimal language definitions for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use crate::{
    Language, LanguageDef, LexedToken, Lexer, LexerInput, LexerRestartInfo, TokenId,
};

struct CharLexer(TokenId);

impl Lexer for CharLexer {
    fn next_token(&mut self, input: &mut LexerInput<'_>) -> Option<LexedToken> {
        input.read()?;
        Some(input.token(self.0.clone()))
    }
}

struct CharLanguage {
    mime: String,
    id: TokenId,
}

impl LanguageDef for CharLanguage {
    fn mime_type(&self) -> &str {
        &self.mime
    }

    fn token_ids(&self) -> Vec<TokenId> {
        vec![self.id.clone()]
    }

    fn create_lexer(&self, _info: &LexerRestartInfo<'_>) -> Box<dyn Lexer> {
        Box::new(CharLexer(self.id.clone()))
    }
}

/// A language lexing every character as one `CHAR` token.
pub(crate) fn language(mime: &str) -> Language {
    Language::new(CharLanguage {
        mime: mime.to_owned(),
        id: TokenId::new("CHAR", 0, None),
    })
    .unwrap()
}
