//! Tokens handed out by token sequences and token changes.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::TokenId;

/// Where a token part sits within a token that spans several joined
/// embedding sections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PartType {
    /// The whole token lies in one section.
    #[default]
    Complete,
    /// First part of a token continuing in the next section.
    Start,
    /// Part of a token that started in an earlier section and continues later.
    Middle,
    /// Last part of a token that started in an earlier section.
    End,
}

/// A lexical unit: id, text and (unless flyweight) its offset in the input.
///
/// Tokens are cheap to clone: the text is a range into a shared buffer.
/// Flyweight tokens carry no offset and are shared by every occurrence of a
/// fixed-text id; [`Token::materialize`] turns one into a positioned copy.
#[derive(Clone)]
pub struct Token {
    id: TokenId,
    source: Arc<str>,
    range: Range<usize>,
    offset: Option<usize>,
    part: PartType,
    flyweight: bool,
    joined: Option<Arc<[Token]>>,
}

impl Token {
    /// Create a positioned token whose text is `source[range]`.
    pub fn new(id: TokenId, source: Arc<str>, range: Range<usize>, offset: usize) -> Self {
        debug_assert!(source.get(range.clone()).is_some(), "token range out of source");
        Token {
            id,
            source,
            range,
            offset: Some(offset),
            part: PartType::Complete,
            flyweight: false,
            joined: None,
        }
    }

    pub(crate) fn flyweight(id: TokenId, text: Arc<str>) -> Self {
        let range = 0..text.len();
        Token {
            id,
            source: text,
            range,
            offset: None,
            part: PartType::Complete,
            flyweight: true,
            joined: None,
        }
    }

    /// Create a token assembled from parts lying in several sections.
    ///
    /// The text is the concatenation of the parts and the offset is the
    /// offset of the first part.
    pub fn joined(id: TokenId, parts: Vec<Token>) -> Self {
        let text: String = parts.iter().map(Token::text).collect();
        let offset = parts.first().and_then(Token::offset);
        let len = text.len();
        Token {
            id,
            source: Arc::from(text),
            range: 0..len,
            offset,
            part: PartType::Complete,
            flyweight: false,
            joined: Some(Arc::from(parts)),
        }
    }

    /// The same token tagged with a part type.
    #[must_use]
    pub fn with_part(mut self, part: PartType) -> Self {
        self.part = part;
        self
    }

    #[inline]
    pub fn id(&self) -> &TokenId {
        &self.id
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.source[self.range.clone()]
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.range.len()
    }

    /// Offset in the input, or `None` for flyweight tokens.
    #[inline]
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// End offset for contiguous positioned tokens.
    pub fn end_offset(&self) -> Option<usize> {
        match &self.joined {
            Some(parts) => parts.last().and_then(Token::end_offset),
            None => self.offset.map(|offset| offset + self.length()),
        }
    }

    #[inline]
    pub fn is_flyweight(&self) -> bool {
        self.flyweight
    }

    #[inline]
    pub fn part_type(&self) -> PartType {
        self.part
    }

    /// Parts of a token spanning several joined sections.
    pub fn joined_parts(&self) -> Option<&[Token]> {
        self.joined.as_deref()
    }

    /// A positioned, independent copy of this token at `offset`.
    ///
    /// Non-flyweight tokens already carry their offset and are returned as is.
    #[must_use]
    pub fn materialize(&self, offset: usize) -> Token {
        if !self.flyweight {
            return self.clone();
        }
        let text: Arc<str> = Arc::from(self.text());
        let len = text.len();
        Token {
            id: self.id.clone(),
            source: text,
            range: 0..len,
            offset: Some(offset),
            part: self.part,
            flyweight: false,
            joined: None,
        }
    }

    /// Returns `true` if both tokens are the same shared instance.
    pub fn is_same_instance(&self, other: &Token) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
            && self.range == other.range
            && self.offset == other.offset
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.offset == other.offset
            && self.part == other.part
            && self.text() == other.text()
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}", self.id, self.text())?;
        match self.offset {
            Some(offset) => write!(f, " @ {offset}")?,
            None => f.write_str(" (flyweight)")?,
        }
        if self.part != PartType::Complete {
            write!(f, " {:?}", self.part)?;
        }
        Ok(())
    }
}
