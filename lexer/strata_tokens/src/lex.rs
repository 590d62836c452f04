//! Lexer driver: runs a language's lexer over a region and records the
//! per-token restart information used by incremental relexing.

use strata_lang::{
    InputAttributes, Language, LanguagePath, LexerInput, LexerRestartInfo, LexerState, PartType,
    TokenIdSet,
};

use crate::list::{Embeddings, TokenEntry};

/// One run of a lexer.
pub(crate) struct LexRun<'a> {
    pub language: &'a Language,
    pub path: &'a LanguagePath,
    pub attributes: Option<&'a InputAttributes>,
    /// Ids lexed but not stored; their lookahead is folded into the
    /// preceding stored token.
    pub skip_ids: Option<&'a TokenIdSet>,
    /// Text being lexed; positions are byte offsets into it.
    pub text: &'a str,
    pub start: usize,
    /// Exclusive end of the region; the lexer sees end of input here.
    pub end: usize,
    pub state: LexerState,
}

pub(crate) struct LexOutcome {
    pub entries: Vec<TokenEntry>,
    /// Lookahead of skipped tokens lexed before the first stored entry.
    pub leading_skip_lookahead: Option<usize>,
    /// The run stopped because `converged` returned `true`.
    pub converged: bool,
}

impl LexRun<'_> {
    /// Lex until the input ends or `converged(position, state)` returns
    /// `true` at a token boundary.
    ///
    /// # Panics
    /// Panics if the lexer returns an empty token or stops before the end of
    /// the region; both are bugs in the language's lexer.
    pub fn run(self, mut converged: impl FnMut(usize, LexerState) -> bool) -> LexOutcome {
        let mut lexer = self.language.create_lexer(&LexerRestartInfo {
            state: self.state,
            language_path: self.path,
            attributes: self.attributes,
        });
        let mut input = LexerInput::new(&self.text[..self.end], self.start);
        let mut state = self.state;
        let mut pos = self.start;
        let mut outcome = LexOutcome {
            entries: Vec::new(),
            leading_skip_lookahead: None,
            converged: false,
        };

        loop {
            if converged(pos, state) {
                outcome.converged = true;
                break;
            }
            let Some(token) = lexer.next_token(&mut input) else {
                assert!(
                    pos >= self.end,
                    "lexer of {} stopped at offset {pos} before the end of input at {}",
                    self.language.mime_type(),
                    self.end,
                );
                break;
            };
            assert!(
                token.length() > 0,
                "lexer of {} returned an empty {} token at offset {pos}",
                self.language.mime_type(),
                token.id(),
            );

            let id = token.id().clone();
            let length = token.length();
            let lookahead = token.lookahead_end();
            let before = state;
            state = lexer.state();

            if self.skip_ids.is_some_and(|skip| skip.contains(&id)) {
                let folded = match outcome.entries.last_mut() {
                    Some(last) => &mut last.lookahead,
                    None => outcome.leading_skip_lookahead.get_or_insert(0),
                };
                *folded = (*folded).max(lookahead);
            } else {
                let text = &self.text[pos..pos + length];
                let flyweight = id.fixed_text() == Some(text)
                    && self.language.flyweight_token(&id).is_some();
                outcome.entries.push(TokenEntry {
                    id,
                    offset: pos,
                    length,
                    flyweight,
                    state_before: before,
                    lookahead,
                    part: PartType::Complete,
                    embeddings: Embeddings::default(),
                });
            }
            pos += length;
        }

        tracing::trace!(
            language = self.language.mime_type(),
            start = self.start,
            end = pos,
            tokens = outcome.entries.len(),
            converged = outcome.converged,
            "lexed region"
        );
        outcome
    }
}
