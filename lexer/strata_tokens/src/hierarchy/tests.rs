#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::test_support::words;
use crate::{Document, TokenHierarchyEventKind};

fn texts(hierarchy: &TokenHierarchy) -> Vec<String> {
    let mut sequence = hierarchy.token_sequence();
    let mut texts = Vec::new();
    while sequence.move_next().unwrap() {
        texts.push(sequence.token().unwrap().text().to_owned());
    }
    texts
}

fn record(hierarchy: &TokenHierarchy) -> (ListenerId, Arc<Mutex<Vec<TokenHierarchyEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let id = hierarchy.add_listener(move |event: &TokenHierarchyEvent| {
        sink.lock().push(event.clone());
    });
    (id, events)
}

#[test]
fn immutable_hierarchy_is_always_active() {
    let hierarchy = TokenHierarchy::builder("one two", words()).build();
    assert!(hierarchy.is_active());
    assert!(!hierarchy.is_mutable());

    hierarchy.set_active(false);
    assert!(hierarchy.is_active());
    assert_eq!(texts(&hierarchy), ["one", " ", "two"]);
}

#[test]
fn document_hierarchy_activates_on_first_sequence() {
    let document = Document::builder("one two", words()).build();
    let read = document.read();
    let hierarchy = read.token_hierarchy();
    let (_, events) = record(hierarchy);
    assert!(!hierarchy.is_active());

    let sequence = hierarchy.token_sequence();
    assert!(hierarchy.is_active());
    assert_eq!(sequence.token_count().unwrap(), 3);

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), TokenHierarchyEventKind::Activity);
    assert!(events[0].token_change().is_none());
}

#[test]
fn deactivation_reports_removed_tokens_and_invalidates_sequences() {
    let document = Document::builder("one two", words()).build();
    let read = document.read();
    let hierarchy = read.token_hierarchy();
    let sequence = hierarchy.token_sequence();
    let (_, events) = record(hierarchy);

    hierarchy.set_active(false);
    assert!(!hierarchy.is_active());
    assert!(!sequence.is_valid());

    {
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), TokenHierarchyEventKind::Activity);
        let change = events[0].token_change().expect("removed root tokens");
        assert_eq!(change.removed_token_count(), 3);
        assert_eq!(change.added_token_count(), 0);
    }

    // Deactivating twice is a no-op.
    hierarchy.set_active(false);
    assert_eq!(events.lock().len(), 1);

    assert_eq!(texts(hierarchy), ["one", " ", "two"]);
}

#[test]
fn relex_fires_event_and_invalidates_sequences() {
    let hierarchy = TokenHierarchy::builder("aa bb cc", words()).build();
    let mut sequence = hierarchy.token_sequence();
    assert!(sequence.move_next().unwrap());
    let (_, events) = record(&hierarchy);

    hierarchy.relex(3, 5).unwrap();

    let error = sequence.move_next().unwrap_err();
    assert!(error.is_concurrent_modification());
    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), TokenHierarchyEventKind::Relex);
    let change = events[0].token_change().expect("relex change");
    assert_eq!(change.language(), &hierarchy.language());
    // The space before "bb" looked ahead into the region.
    assert_eq!(change.index(), 1);
    let removed: Vec<&str> = change.removed_tokens().iter().map(|t| t.text()).collect();
    let added: Vec<&str> = change.added_tokens().iter().map(|t| t.text()).collect();
    assert_eq!(removed, [" ", "bb"]);
    assert_eq!(added, [" ", "bb"]);
}

#[test]
fn relex_rejects_bad_regions() {
    let hierarchy = TokenHierarchy::builder("aa", words()).build();
    assert_eq!(
        hierarchy.relex(1, 5),
        Err(TokenError::OffsetOutOfBounds {
            offset: 5,
            length: 2
        })
    );
    assert_eq!(
        hierarchy.relex(2, 1),
        Err(TokenError::OffsetOutOfBounds {
            offset: 2,
            length: 2
        })
    );
    assert_eq!(hierarchy.relex(1, 1), Ok(()));
}

#[test]
fn rebuild_replaces_every_token() {
    let hierarchy = TokenHierarchy::builder("aa bb", words()).build();
    let sequence = hierarchy.token_sequence();
    let (_, events) = record(&hierarchy);

    hierarchy.rebuild().unwrap();

    assert!(!sequence.is_valid());
    let events = events.lock();
    assert_eq!(events[0].kind(), TokenHierarchyEventKind::Rebuild);
    let change = events[0].token_change().unwrap();
    assert_eq!(change.index(), 0);
    assert_eq!(change.removed_token_count(), 3);
    assert_eq!(change.added_token_count(), 3);
    assert_eq!(events[0].affected_start_offset(), 0);
    assert_eq!(events[0].affected_end_offset(), 5);
}

#[test]
fn removed_listener_is_not_notified() {
    let hierarchy = TokenHierarchy::builder("aa", words()).build();
    let (id, events) = record(&hierarchy);

    assert!(hierarchy.remove_listener(id));
    assert!(!hierarchy.remove_listener(id));
    hierarchy.rebuild().unwrap();
    assert!(events.lock().is_empty());
}

#[test]
fn edit_keeps_tokens_after_convergence() {
    let document = Document::builder("aa bb cc dd", words()).build();
    let (_, events) = record(document.read().token_hierarchy());
    let _ = document.read().token_hierarchy().token_sequence();
    events.lock().clear();

    document.write().insert(4, "x").unwrap();

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), TokenHierarchyEventKind::Modification);
    let change = events[0].token_change().unwrap();
    // Relexing restarts at "bb" and stops at the shifted " " after it.
    assert_eq!(change.index(), 2);
    assert_eq!(change.offset(), 3);
    assert_eq!(change.removed_tokens()[0].text(), "bb");
    assert_eq!(change.added_tokens()[0].text(), "bxb");
    assert_eq!(events[0].affected_start_offset(), 3);
    assert_eq!(events[0].affected_end_offset(), 6);

    let read = document.read();
    let state = read.token_hierarchy().shared().state.lock();
    let root = state.lists.get(state.root.unwrap()).unwrap();
    let offsets: Vec<usize> = root.entries.iter().map(|entry| entry.offset).collect();
    assert_eq!(offsets, [0, 2, 3, 6, 7, 9, 10]);
    assert_eq!(root.end, 12);
}

#[test]
fn skipped_tokens_are_not_stored() {
    let language = words();
    let space = language.token_id_by_name("SPACE").unwrap().clone();
    let hierarchy = TokenHierarchy::builder("aa bb  cc", language)
        .skip_ids(std::iter::once(space).collect())
        .build();

    let mut sequence = hierarchy.token_sequence();
    let mut seen = Vec::new();
    while sequence.move_next().unwrap() {
        seen.push((sequence.offset().unwrap(), sequence.token().unwrap().text().to_owned()));
    }
    assert_eq!(
        seen,
        [(0, "aa".to_owned()), (3, "bb".to_owned()), (7, "cc".to_owned())]
    );
}

#[test]
fn edit_of_inactive_document_fires_nothing() {
    let document = Document::builder("aa", words()).build();
    let (_, events) = record(document.read().token_hierarchy());

    document.write().insert(2, " bb").unwrap();

    assert!(events.lock().is_empty());
    assert_eq!(texts(document.read().token_hierarchy()), ["aa", " ", "bb"]);
}

#[test]
fn document_relex_and_rebuild_require_the_write_lock() {
    let document = Document::builder("aa bb", words()).build();
    let (_, events) = record(document.read().token_hierarchy());
    {
        let read = document.read();
        let hierarchy = read.token_hierarchy();
        let sequence = hierarchy.token_sequence();
        events.lock().clear();

        assert_eq!(hierarchy.rebuild(), Err(TokenError::WriteLockRequired));
        assert_eq!(hierarchy.relex(0, 2), Err(TokenError::WriteLockRequired));
        assert!(sequence.is_valid());
        assert!(events.lock().is_empty());
    }

    let write = document.write();
    write.token_hierarchy().relex(0, 2).unwrap();
    write.token_hierarchy().rebuild().unwrap();
    let kinds: Vec<_> = events.lock().iter().map(TokenHierarchyEvent::kind).collect();
    assert_eq!(
        kinds,
        [
            TokenHierarchyEventKind::Relex,
            TokenHierarchyEventKind::Rebuild
        ]
    );
}
