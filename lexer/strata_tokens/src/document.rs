//! Mutable inputs.
//!
//! A [`Document`] owns its text behind a read-write lock together with the
//! text's token hierarchy. The hierarchy is only reachable through the
//! document's guards, so reading tokens always happens under the read lock
//! and editing under the write lock. Hierarchy events of an edit are
//! delivered before the write guard's edit method returns.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use strata_lang::{InputAttributes, Language, TokenIdSet};

use crate::{TextModification, TokenError, TokenHierarchy, TokenHierarchyBuilder};

/// Builder for a [`Document`].
pub struct DocumentBuilder {
    inner: TokenHierarchyBuilder,
    text: String,
}

impl DocumentBuilder {
    /// Leave tokens of these ids out of the root list.
    #[must_use]
    pub fn skip_ids(mut self, skip_ids: TokenIdSet) -> Self {
        self.inner = self.inner.skip_ids(skip_ids);
        self
    }

    /// Attributes handed to lexers and embedding resolvers.
    #[must_use]
    pub fn attributes(mut self, attributes: Arc<InputAttributes>) -> Self {
        self.inner = self.inner.attributes(attributes);
        self
    }

    pub fn build(self) -> Document {
        let (config, text) = self.inner.into_parts();
        Document {
            text: RwLock::new(self.text),
            hierarchy: TokenHierarchy::from_config(config, text, true),
        }
    }
}

/// Editable text with a token hierarchy.
pub struct Document {
    text: RwLock<String>,
    hierarchy: TokenHierarchy,
}

impl Document {
    pub fn builder(text: impl Into<String>, language: Language) -> DocumentBuilder {
        let text = text.into();
        DocumentBuilder {
            inner: TokenHierarchy::builder(text.as_str(), language),
            text,
        }
    }

    /// Acquire the read lock.
    pub fn read(&self) -> DocumentRead<'_> {
        DocumentRead {
            text: self.text.read(),
            hierarchy: &self.hierarchy,
        }
    }

    /// Acquire the write lock.
    pub fn write(&self) -> DocumentWrite<'_> {
        let text = self.text.write();
        self.hierarchy
            .shared()
            .write_held
            .store(true, Ordering::Release);
        DocumentWrite {
            text,
            hierarchy: &self.hierarchy,
        }
    }
}

/// Read access to a [`Document`].
pub struct DocumentRead<'a> {
    text: RwLockReadGuard<'a, String>,
    hierarchy: &'a TokenHierarchy,
}

impl DocumentRead<'_> {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_hierarchy(&self) -> &TokenHierarchy {
        self.hierarchy
    }
}

/// Write access to a [`Document`].
pub struct DocumentWrite<'a> {
    text: RwLockWriteGuard<'a, String>,
    hierarchy: &'a TokenHierarchy,
}

impl DocumentWrite<'_> {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_hierarchy(&self) -> &TokenHierarchy {
        self.hierarchy
    }

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), TokenError> {
        self.replace(offset, 0, text)
    }

    /// Remove `length` bytes at `offset`.
    pub fn remove(&mut self, offset: usize, length: usize) -> Result<(), TokenError> {
        self.replace(offset, length, "")
    }

    /// Replace `length` bytes at `offset` by `text`.
    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<(), TokenError> {
        let end = offset
            .checked_add(length)
            .filter(|end| *end <= self.text.len())
            .ok_or(TokenError::OffsetOutOfBounds {
                offset: offset.saturating_add(length),
                length: self.text.len(),
            })?;
        for boundary in [offset, end] {
            if !self.text.is_char_boundary(boundary) {
                return Err(TokenError::OffsetOutOfBounds {
                    offset: boundary,
                    length: self.text.len(),
                });
            }
        }
        if length == 0 && text.is_empty() {
            return Ok(());
        }
        self.text.replace_range(offset..end, text);
        let snapshot: Arc<str> = Arc::from(self.text.as_str());
        self.hierarchy.apply_modification(
            snapshot,
            TextModification::new(offset, length, text.len()),
        );
        Ok(())
    }
}

impl Drop for DocumentWrite<'_> {
    fn drop(&mut self) {
        self.hierarchy
            .shared()
            .write_held
            .store(false, Ordering::Release);
    }
}
