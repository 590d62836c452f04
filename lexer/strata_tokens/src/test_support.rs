//! Minimal language for unit tests: runs of spaces and runs of anything else.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use strata_lang::{Language, LanguageDef, LexedToken, Lexer, LexerInput, LexerRestartInfo, TokenId};

struct WordLexer {
    word: TokenId,
    space: TokenId,
}

impl Lexer for WordLexer {
    fn next_token(&mut self, input: &mut LexerInput<'_>) -> Option<LexedToken> {
        let space = input.read()? == ' ';
        while let Some(ch) = input.read() {
            if (ch == ' ') != space {
                input.backup(1);
                break;
            }
        }
        let id = if space { &self.space } else { &self.word };
        Some(input.token(id.clone()))
    }
}

struct Words {
    word: TokenId,
    space: TokenId,
}

impl LanguageDef for Words {
    fn mime_type(&self) -> &str {
        "text/x-words"
    }

    fn token_ids(&self) -> Vec<TokenId> {
        vec![self.word.clone(), self.space.clone()]
    }

    fn create_lexer(&self, _info: &LexerRestartInfo<'_>) -> Box<dyn Lexer> {
        Box::new(WordLexer {
            word: self.word.clone(),
            space: self.space.clone(),
        })
    }
}

/// A fresh `text/x-words` language with ids `WORD` and `SPACE`.
pub(crate) fn words() -> Language {
    Language::new(Words {
        word: TokenId::new("WORD", 0, None),
        space: TokenId::new("SPACE", 1, Some("whitespace")),
    })
    .unwrap()
}
