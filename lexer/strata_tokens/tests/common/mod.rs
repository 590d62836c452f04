//! Sample languages shared by the integration tests.
//!
//! - `text/x-plain`: words, numbers, whitespace and fixed-text `.`/`+`
//! - `text/x-markup`: text with `{...}` script blocks embedding plain text
//! - `text/x-template`: text with `<%...%>` blocks whose plain-text contents
//!   are joined into one stream

#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::sync::{Once, OnceLock};

use strata_lang::{
    InputAttributes, Language, LanguageDef, LanguageEmbedding, LanguagePath, LexedToken, Lexer,
    LexerInput, LexerRestartInfo, Token, TokenId,
};

/// Install a tracing subscriber when `RUST_LOG` is set.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            use tracing_subscriber::prelude::*;
            use tracing_subscriber::{fmt, EnvFilter};

            tracing_subscriber::registry()
                .with(fmt::layer().with_test_writer())
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

pub struct PlainIds {
    pub word: TokenId,
    pub number: TokenId,
    pub whitespace: TokenId,
    pub dot: TokenId,
    pub plus: TokenId,
    pub other: TokenId,
}

pub fn plain_ids() -> &'static PlainIds {
    static IDS: OnceLock<PlainIds> = OnceLock::new();
    IDS.get_or_init(|| PlainIds {
        word: TokenId::new("WORD", 0, Some("identifier")),
        number: TokenId::new("NUMBER", 1, Some("literal")),
        whitespace: TokenId::new("WHITESPACE", 2, Some("whitespace")),
        dot: TokenId::with_fixed_text("DOT", 3, Some("operator"), "."),
        plus: TokenId::with_fixed_text("PLUS", 4, Some("operator"), "+"),
        other: TokenId::new("OTHER", 5, Some("error")),
    })
}

struct PlainLexer(&'static PlainIds);

impl PlainLexer {
    fn consume_while(input: &mut LexerInput<'_>, accept: impl Fn(char) -> bool) {
        while let Some(ch) = input.read() {
            if !accept(ch) {
                input.backup(1);
                break;
            }
        }
    }
}

impl Lexer for PlainLexer {
    fn next_token(&mut self, input: &mut LexerInput<'_>) -> Option<LexedToken> {
        let ids = self.0;
        let first = input.read()?;
        let id = if first.is_alphabetic() || first == '_' {
            Self::consume_while(input, |ch| ch.is_alphanumeric() || ch == '_');
            &ids.word
        } else if first.is_ascii_digit() {
            Self::consume_while(input, |ch| ch.is_ascii_digit());
            &ids.number
        } else if first.is_whitespace() {
            Self::consume_while(input, char::is_whitespace);
            &ids.whitespace
        } else if first == '.' {
            &ids.dot
        } else if first == '+' {
            &ids.plus
        } else {
            &ids.other
        };
        Some(input.token(id.clone()))
    }
}

struct Plain;

impl LanguageDef for Plain {
    fn mime_type(&self) -> &str {
        "text/x-plain"
    }

    fn token_ids(&self) -> Vec<TokenId> {
        let ids = plain_ids();
        vec![
            ids.word.clone(),
            ids.number.clone(),
            ids.whitespace.clone(),
            ids.dot.clone(),
            ids.plus.clone(),
            ids.other.clone(),
        ]
    }

    fn token_categories(&self) -> Vec<(String, Vec<TokenId>)> {
        let ids = plain_ids();
        vec![(
            "literal-or-name".to_owned(),
            vec![ids.word.clone(), ids.number.clone()],
        )]
    }

    fn create_lexer(&self, _info: &LexerRestartInfo<'_>) -> Box<dyn Lexer> {
        Box::new(PlainLexer(plain_ids()))
    }
}

pub fn plain() -> Language {
    static LANGUAGE: OnceLock<Language> = OnceLock::new();
    LANGUAGE
        .get_or_init(|| Language::new(Plain).expect("plain language is valid"))
        .clone()
}

pub struct MarkupIds {
    pub text: TokenId,
    pub script: TokenId,
}

pub fn markup_ids() -> &'static MarkupIds {
    static IDS: OnceLock<MarkupIds> = OnceLock::new();
    IDS.get_or_init(|| MarkupIds {
        text: TokenId::new("TEXT", 0, Some("text")),
        script: TokenId::new("SCRIPT", 1, Some("script")),
    })
}

struct MarkupLexer(&'static MarkupIds);

impl Lexer for MarkupLexer {
    fn next_token(&mut self, input: &mut LexerInput<'_>) -> Option<LexedToken> {
        let ids = self.0;
        if input.read()? == '{' {
            while let Some(ch) = input.read() {
                if ch == '}' {
                    break;
                }
            }
            return Some(input.token(ids.script.clone()));
        }
        while let Some(ch) = input.read() {
            if ch == '{' {
                input.backup(1);
                break;
            }
        }
        Some(input.token(ids.text.clone()))
    }
}

struct Markup;

impl LanguageDef for Markup {
    fn mime_type(&self) -> &str {
        "text/x-markup"
    }

    fn token_ids(&self) -> Vec<TokenId> {
        let ids = markup_ids();
        vec![ids.text.clone(), ids.script.clone()]
    }

    fn create_lexer(&self, _info: &LexerRestartInfo<'_>) -> Box<dyn Lexer> {
        Box::new(MarkupLexer(markup_ids()))
    }

    fn embedding(
        &self,
        token: &Token,
        _path: &LanguagePath,
        _attributes: Option<&InputAttributes>,
    ) -> Option<LanguageEmbedding> {
        if token.id() != &markup_ids().script {
            return None;
        }
        let end_skip = usize::from(token.length() > 1 && token.text().ends_with('}'));
        Some(LanguageEmbedding::new(plain(), 1, end_skip, false))
    }

    fn embedded_languages(&self) -> Vec<Language> {
        vec![plain()]
    }
}

pub fn markup() -> Language {
    static LANGUAGE: OnceLock<Language> = OnceLock::new();
    LANGUAGE
        .get_or_init(|| Language::new(Markup).expect("markup language is valid"))
        .clone()
}

pub struct TemplateIds {
    pub text: TokenId,
    pub code: TokenId,
}

pub fn template_ids() -> &'static TemplateIds {
    static IDS: OnceLock<TemplateIds> = OnceLock::new();
    IDS.get_or_init(|| TemplateIds {
        text: TokenId::new("TEXT", 0, Some("text")),
        code: TokenId::new("CODE", 1, Some("code")),
    })
}

struct TemplateLexer(&'static TemplateIds);

impl Lexer for TemplateLexer {
    fn next_token(&mut self, input: &mut LexerInput<'_>) -> Option<LexedToken> {
        let ids = self.0;
        if input.read()? == '<' {
            match input.read() {
                Some('%') => {
                    let mut previous = '\0';
                    while let Some(ch) = input.read() {
                        if previous == '%' && ch == '>' {
                            break;
                        }
                        previous = ch;
                    }
                    return Some(input.token(ids.code.clone()));
                }
                Some(_) => input.backup(1),
                None => return Some(input.token(ids.text.clone())),
            }
        }
        while let Some(ch) = input.read() {
            if ch == '<' {
                match input.read() {
                    Some('%') => {
                        input.backup(2);
                        break;
                    }
                    Some(_) => input.backup(1),
                    None => break,
                }
            }
        }
        Some(input.token(ids.text.clone()))
    }
}

struct Template;

impl LanguageDef for Template {
    fn mime_type(&self) -> &str {
        "text/x-template"
    }

    fn token_ids(&self) -> Vec<TokenId> {
        let ids = template_ids();
        vec![ids.text.clone(), ids.code.clone()]
    }

    fn create_lexer(&self, _info: &LexerRestartInfo<'_>) -> Box<dyn Lexer> {
        Box::new(TemplateLexer(template_ids()))
    }

    fn embedding(
        &self,
        token: &Token,
        _path: &LanguagePath,
        _attributes: Option<&InputAttributes>,
    ) -> Option<LanguageEmbedding> {
        if token.id() != &template_ids().code {
            return None;
        }
        let closed = token.length() >= 4 && token.text().ends_with("%>");
        Some(LanguageEmbedding::new(plain(), 2, if closed { 2 } else { 0 }, true))
    }

    fn embedded_languages(&self) -> Vec<Language> {
        vec![plain()]
    }
}

pub fn template() -> Language {
    static LANGUAGE: OnceLock<Language> = OnceLock::new();
    LANGUAGE
        .get_or_init(|| Language::new(Template).expect("template language is valid"))
        .clone()
}

/// `(id name, text)` of every remaining token of `sequence`.
pub fn dump(sequence: &mut strata_tokens::TokenSequence) -> Vec<(&'static str, String)> {
    let mut tokens = Vec::new();
    while sequence.move_next().expect("sequence is valid") {
        let token = sequence.token().expect("positioned on a token");
        tokens.push((token.id().name(), token.text().to_owned()));
    }
    tokens
}
