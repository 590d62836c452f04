//! Token hierarchies: the tokens of one input at every embedding level.
//!
//! A [`TokenHierarchy`] owns the root token list of an input and every
//! embedded list created from it. Immutable inputs get their hierarchy from
//! [`TokenHierarchy::builder`]; mutable inputs go through
//! [`Document`](crate::Document), whose guards are the only way to reach
//! their hierarchy.
//!
//! # Lifecycle
//!
//! Hierarchies of mutable inputs start inactive and activate on the first
//! request for a token sequence. Deactivation drops every token list and
//! fires an [`Activity`](TokenHierarchyEventKind::Activity) event; the next
//! request lexes the input again.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use strata_lang::{InputAttributes, Language, LanguagePath, TokenIdSet};

use crate::state::{HierarchyConfig, HierarchyState, Target};
use crate::{
    ListenerId, TextModification, TokenError, TokenHierarchyEvent, TokenHierarchyEventKind,
    TokenHierarchyListener, TokenSequence, TokenSequenceList,
};

type ListenerList = Vec<(ListenerId, Arc<dyn TokenHierarchyListener>)>;

/// State shared by a hierarchy and the sequences it hands out.
pub(crate) struct HierarchyShared {
    pub state: Mutex<HierarchyState>,
    listeners: Mutex<ListenerList>,
    next_listener: AtomicU64,
    pub mutable: bool,
    /// A document write guard is held.
    pub write_held: AtomicBool,
}

impl HierarchyShared {
    /// Deliver an event to every listener.
    ///
    /// Must be called without holding the state lock.
    pub fn fire(&self, event: &TokenHierarchyEvent) {
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        tracing::trace!(
            kind = ?event.kind(),
            listeners = listeners.len(),
            "firing token hierarchy event"
        );
        for listener in listeners {
            listener.token_hierarchy_changed(event);
        }
    }

    /// Fail unless the tokens of a mutable input may be changed right now.
    pub fn check_write(&self) -> Result<(), TokenError> {
        if self.mutable && !self.write_held.load(Ordering::Acquire) {
            Err(TokenError::WriteLockRequired)
        } else {
            Ok(())
        }
    }
}

/// Builder for immutable-input hierarchies.
pub struct TokenHierarchyBuilder {
    text: Arc<str>,
    language: Language,
    skip_ids: Option<TokenIdSet>,
    attributes: Option<Arc<InputAttributes>>,
}

impl TokenHierarchyBuilder {
    /// Leave tokens of these ids out of the root list.
    #[must_use]
    pub fn skip_ids(mut self, skip_ids: TokenIdSet) -> Self {
        self.skip_ids = Some(skip_ids);
        self
    }

    /// Attributes handed to lexers and embedding resolvers.
    #[must_use]
    pub fn attributes(mut self, attributes: Arc<InputAttributes>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn build(self) -> TokenHierarchy {
        let (config, text) = self.into_parts();
        TokenHierarchy::from_config(config, text, false)
    }

    pub(crate) fn into_parts(self) -> (HierarchyConfig, Arc<str>) {
        let root_path = LanguagePath::get(&self.language);
        (
            HierarchyConfig {
                language: self.language,
                root_path,
                skip_ids: self.skip_ids,
                attributes: self.attributes,
            },
            self.text,
        )
    }
}

/// The tokens of one input.
pub struct TokenHierarchy {
    shared: Arc<HierarchyShared>,
}

impl TokenHierarchy {
    /// Start building a hierarchy over immutable `text`.
    pub fn builder(text: impl Into<Arc<str>>, language: Language) -> TokenHierarchyBuilder {
        TokenHierarchyBuilder {
            text: text.into(),
            language,
            skip_ids: None,
            attributes: None,
        }
    }

    pub(crate) fn from_config(config: HierarchyConfig, text: Arc<str>, mutable: bool) -> Self {
        tracing::debug!(
            language = config.language.mime_type(),
            length = text.len(),
            mutable,
            "token hierarchy created"
        );
        TokenHierarchy {
            shared: Arc::new(HierarchyShared {
                state: Mutex::new(HierarchyState::new(config, text, !mutable)),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                mutable,
                write_held: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<HierarchyShared> {
        &self.shared
    }

    /// Top-level language of the input.
    pub fn language(&self) -> Language {
        self.shared.state.lock().config.language.clone()
    }

    /// Snapshot of the current text.
    pub fn text(&self) -> Arc<str> {
        Arc::clone(&self.shared.state.lock().text)
    }

    /// Returns `true` for hierarchies of a [`Document`](crate::Document).
    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.shared.mutable
    }

    pub fn is_active(&self) -> bool {
        self.shared.state.lock().active
    }

    /// Activate or deactivate the hierarchy of a mutable input.
    ///
    /// Hierarchies of immutable inputs are always active and ignore this.
    pub fn set_active(&self, active: bool) {
        if !self.shared.mutable {
            return;
        }
        let event = {
            let mut state = self.shared.state.lock();
            if state.active == active {
                return;
            }
            let change = if active {
                state.active = true;
                None
            } else {
                state.deactivate()
            };
            tracing::debug!(active, "token hierarchy activity changed");
            TokenHierarchyEvent::new(TokenHierarchyEventKind::Activity, change, None)
        };
        self.shared.fire(&event);
    }

    /// Activate if needed and run `f` on the state.
    fn with_active<R>(&self, f: impl FnOnce(&mut HierarchyState) -> R) -> R {
        let (result, activated) = {
            let mut state = self.shared.state.lock();
            let activated = !state.active;
            state.active = true;
            (f(&mut state), activated)
        };
        if activated {
            tracing::debug!("token hierarchy activated on demand");
            self.shared.fire(&TokenHierarchyEvent::new(
                TokenHierarchyEventKind::Activity,
                None,
                None,
            ));
        }
        result
    }

    /// Sequence over the root token list.
    pub fn token_sequence(&self) -> TokenSequence {
        self.with_active(|state| {
            let root = state.ensure_root();
            let count = state.lists.get(root).map_or(0, |list| list.entries.len());
            let continuous = state.config.skip_ids.is_none();
            TokenSequence::new(
                Arc::clone(&self.shared),
                Target::List {
                    id: root,
                    revision: 0,
                },
                state.config.root_path.clone(),
                state.mod_count,
                0..count,
                continuous,
            )
        })
    }

    /// Sequences over every list with language path `path` overlapping
    /// `start..end`.
    ///
    /// The lists are collected on first access of the returned value.
    pub fn token_sequence_list(
        &self,
        path: &LanguagePath,
        start: usize,
        end: usize,
    ) -> TokenSequenceList {
        let expected_mod = self.with_active(|state| state.mod_count);
        TokenSequenceList::new(Arc::clone(&self.shared), path.clone(), start, end, expected_mod)
    }

    /// Sequences from the root down to the most deeply embedded token at
    /// `offset`, each positioned on the token containing `offset`.
    ///
    /// With `backward_bias` a token ending at `offset` is preferred over one
    /// starting there.
    pub fn embedded_token_sequences(&self, offset: usize, backward_bias: bool) -> Vec<TokenSequence> {
        let mut sequences = Vec::new();
        let mut sequence = self.token_sequence();
        loop {
            if !position_at(&mut sequence, offset, backward_bias) {
                break;
            }
            let embedded = sequence.embedded();
            sequences.push(sequence);
            match embedded {
                Ok(Some(next)) => sequence = next,
                _ => break,
            }
        }
        sequences
    }

    /// Every language path statically reachable from the top-level language,
    /// plus paths of custom embeddings.
    pub fn language_paths(&self) -> Vec<LanguagePath> {
        self.shared.state.lock().language_paths()
    }

    /// Relex the whole input and fire a
    /// [`Rebuild`](TokenHierarchyEventKind::Rebuild) event.
    ///
    /// Hierarchies of a [`Document`](crate::Document) require its write
    /// guard.
    pub fn rebuild(&self) -> Result<(), TokenError> {
        self.shared.check_write()?;
        let change = {
            let mut state = self.shared.state.lock();
            if !state.active {
                return Ok(());
            }
            state.rebuild()
        };
        tracing::debug!("token hierarchy rebuilt");
        self.shared.fire(&TokenHierarchyEvent::new(
            TokenHierarchyEventKind::Rebuild,
            change,
            None,
        ));
        Ok(())
    }

    /// Relex `start..end` without a text change and fire a
    /// [`Relex`](TokenHierarchyEventKind::Relex) event.
    ///
    /// Hierarchies of a [`Document`](crate::Document) require its write
    /// guard.
    pub fn relex(&self, start: usize, end: usize) -> Result<(), TokenError> {
        self.shared.check_write()?;
        let change = {
            let mut state = self.shared.state.lock();
            let length = state.text.len();
            if start > end || end > length {
                return Err(TokenError::OffsetOutOfBounds {
                    offset: if start > end { start } else { end },
                    length,
                });
            }
            if !state.active || state.root.is_none() || start == end {
                return Ok(());
            }
            state.relex_region(start, end)
        };
        self.shared.fire(&TokenHierarchyEvent::new(
            TokenHierarchyEventKind::Relex,
            change,
            None,
        ));
        Ok(())
    }

    /// Register a listener.
    pub fn add_listener(&self, listener: impl TokenHierarchyListener + 'static) -> ListenerId {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        let listener: Arc<dyn TokenHierarchyListener> = Arc::new(listener);
        self.shared.listeners.lock().push((id, listener));
        id
    }

    /// Unregister a listener; returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    /// Apply a modification of a mutable input.
    pub(crate) fn apply_modification(&self, text: Arc<str>, modification: TextModification) {
        let change = {
            let mut state = self.shared.state.lock();
            let active = state.active && state.root.is_some();
            let change = state.apply_modification(text, modification);
            if !active {
                return;
            }
            change
        };
        self.shared.fire(&TokenHierarchyEvent::new(
            TokenHierarchyEventKind::Modification,
            change,
            Some(modification),
        ));
    }
}

/// Position `sequence` on the token containing `offset`.
fn position_at(sequence: &mut TokenSequence, offset: usize, backward_bias: bool) -> bool {
    let Ok(Some(diff)) = sequence.move_to(offset) else {
        return false;
    };
    if backward_bias && diff == 0 && sequence.index() > 0 {
        return sequence.move_previous().unwrap_or(false);
    }
    if diff < 0 {
        return false;
    }
    if !sequence.move_next().unwrap_or(false) {
        return backward_bias
            && diff == 0
            && sequence.move_previous().unwrap_or(false);
    }
    true
}

impl fmt::Debug for TokenHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TokenHierarchy")
            .field("language", &state.config.language)
            .field("length", &state.text.len())
            .field("active", &state.active)
            .field("lists", &state.lists.len())
            .field("mutable", &self.shared.mutable)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
