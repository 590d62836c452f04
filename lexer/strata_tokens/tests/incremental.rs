#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

mod common;

use std::sync::Arc;

use common::{dump, init_tracing, markup, plain};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use strata_tokens::{
    Document, TokenError, TokenHierarchy, TokenHierarchyEvent, TokenHierarchyEventKind,
};

type Events = Arc<Mutex<Vec<TokenHierarchyEvent>>>;

fn listen(hierarchy: &TokenHierarchy) -> Events {
    let events: Events = Arc::default();
    let sink = Arc::clone(&events);
    hierarchy.add_listener(move |event: &TokenHierarchyEvent| sink.lock().push(event.clone()));
    events
}

/// Active document with a listener registered after activation.
fn document(text: &str, language: strata_lang::Language) -> (Document, Events) {
    let document = Document::builder(text, language).build();
    let events = {
        let read = document.read();
        let hierarchy = read.token_hierarchy();
        hierarchy.token_sequence();
        listen(hierarchy)
    };
    (document, events)
}

fn texts(change: &[strata_lang::Token]) -> Vec<&str> {
    change.iter().map(strata_lang::Token::text).collect()
}

#[test]
fn growing_a_token_is_a_bounds_change() {
    init_tracing();
    let (document, events) = document("ab cd", plain());

    document.write().insert(1, "x").unwrap();

    let events = events.lock();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind(), TokenHierarchyEventKind::Modification);
    let modification = event.modification().unwrap();
    assert_eq!(modification.offset, 1);
    assert_eq!(modification.inserted_length, 1);

    let change = event.token_change().unwrap();
    assert!(change.is_bounds_change());
    assert_eq!(change.index(), 0);
    assert_eq!(texts(change.removed_tokens()), ["ab"]);
    assert_eq!(texts(change.added_tokens()), ["axb"]);
    assert_eq!(change.removed_tokens()[0].offset(), Some(0));
    assert_eq!(change.added_end_offset(), 3);
}

#[test]
fn splitting_a_token_replaces_it() {
    let (document, events) = document("ab cd", plain());

    document.write().insert(1, " ").unwrap();

    let events = events.lock();
    let change = events[0].token_change().unwrap();
    assert!(!change.is_bounds_change());
    assert_eq!(change.index(), 0);
    assert_eq!(texts(change.removed_tokens()), ["ab"]);
    assert_eq!(texts(change.added_tokens()), ["a", " ", "b"]);

    let read = document.read();
    let mut sequence = read.token_hierarchy().token_sequence();
    assert_eq!(
        dump(&mut sequence),
        [
            ("WORD", "a".to_owned()),
            ("WHITESPACE", " ".to_owned()),
            ("WORD", "b".to_owned()),
            ("WHITESPACE", " ".to_owned()),
            ("WORD", "cd".to_owned()),
        ]
    );
}

#[test]
fn removal_joins_neighbouring_tokens() {
    let (document, events) = document("ab cd ef", plain());

    document.write().remove(2, 1).unwrap();

    let events = events.lock();
    let change = events[0].token_change().unwrap();
    assert_eq!(change.index(), 0);
    assert_eq!(texts(change.removed_tokens()), ["ab", " ", "cd"]);
    assert_eq!(texts(change.added_tokens()), ["abcd"]);
    assert_eq!(events[0].affected_start_offset(), 0);
    assert_eq!(events[0].affected_end_offset(), 4);
}

#[test]
fn stale_sequences_fail() {
    let (document, _events) = document("ab cd", plain());
    let mut sequence = document.read().token_hierarchy().token_sequence();
    assert!(sequence.move_next().unwrap());

    document.write().insert(0, "z").unwrap();

    assert!(!sequence.is_valid());
    assert_eq!(sequence.move_next(), Err(TokenError::ConcurrentModification));
    assert_eq!(sequence.token(), Err(TokenError::ConcurrentModification));
    assert!(sequence.move_to(0).unwrap_err().is_concurrent_modification());

    let mut fresh = document.read().token_hierarchy().token_sequence();
    assert!(fresh.move_next().unwrap());
    assert_eq!(fresh.token().unwrap().text(), "zab");
}

#[test]
fn edit_inside_script_reports_nested_change() {
    let (document, events) = document("x{ab cd}y", markup());
    {
        let read = document.read();
        let mut root = read.token_hierarchy().token_sequence();
        root.move_index(1).unwrap();
        assert!(root.move_next().unwrap());
        let mut script = root.embedded().unwrap().expect("script embeds plain text");
        assert_eq!(script.language(), &plain());
        assert_eq!(script.token_count().unwrap(), 3);
        assert!(script.move_next().unwrap());
        assert_eq!(script.offset().unwrap(), 2);
    }

    document.write().insert(3, "z").unwrap();

    let events = events.lock();
    let change = events[0].token_change().unwrap();
    assert!(change.is_bounds_change());
    assert_eq!(change.index(), 1);
    assert_eq!(texts(change.added_tokens()), ["{azb cd}"]);
    assert_eq!(change.embedded_change_count(), 1);

    let nested = &change.embedded_changes()[0];
    assert_eq!(nested.language(), &plain());
    assert_eq!(nested.language_path().size(), 2);
    assert_eq!(nested.index(), 0);
    assert_eq!(texts(nested.removed_tokens()), ["ab"]);
    assert_eq!(texts(nested.added_tokens()), ["azb"]);
    assert!(nested.is_bounds_change());

    drop(events);
    let read = document.read();
    let mut root = read.token_hierarchy().token_sequence();
    root.move_index(1).unwrap();
    assert!(root.move_next().unwrap());
    let mut script = root.embedded().unwrap().unwrap();
    assert_eq!(
        dump(&mut script),
        [
            ("WORD", "azb".to_owned()),
            ("WHITESPACE", " ".to_owned()),
            ("WORD", "cd".to_owned()),
        ]
    );
}

#[test]
fn edit_of_script_delimiter_drops_embedding() {
    let (document, events) = document("x{ab}y", markup());
    {
        let read = document.read();
        let mut root = read.token_hierarchy().token_sequence();
        root.move_index(1).unwrap();
        assert!(root.move_next().unwrap());
        assert!(root.embedded().unwrap().is_some());
    }

    // Replacing the closing brace makes the script run to the end of input.
    document.write().replace(4, 1, ")").unwrap();

    let events = events.lock();
    let change = events[0].token_change().unwrap();
    assert_eq!(texts(change.removed_tokens()), ["{ab}", "y"]);
    assert_eq!(texts(change.added_tokens()), ["{ab)y"]);
    assert_eq!(change.embedded_change_count(), 0);
    drop(events);

    let read = document.read();
    let mut root = read.token_hierarchy().token_sequence();
    root.move_index(1).unwrap();
    assert!(root.move_next().unwrap());
    let mut script = root.embedded().unwrap().unwrap();
    assert_eq!(
        dump(&mut script),
        [
            ("WORD", "ab".to_owned()),
            ("OTHER", ")".to_owned()),
            ("WORD", "y".to_owned()),
        ]
    );
}

#[test]
fn edits_after_a_script_shift_its_tokens() {
    let (document, _events) = document("{a b}", markup());
    let offsets = |document: &Document, index: usize| {
        let read = document.read();
        let mut root = read.token_hierarchy().token_sequence();
        root.move_index(index).unwrap();
        assert!(root.move_next().unwrap());
        let mut script = root.embedded().unwrap().unwrap();
        let mut offsets = Vec::new();
        while script.move_next().unwrap() {
            offsets.push(script.offset().unwrap());
        }
        offsets
    };
    assert_eq!(offsets(&document, 0), [1, 2, 3]);

    document.write().insert(0, "hello ").unwrap();

    assert_eq!(offsets(&document, 1), [7, 8, 9]);
}

#[test]
fn deactivation_fires_activity_and_relexes_on_demand() {
    let (document, events) = document("ab cd", plain());
    let read = document.read();
    let hierarchy = read.token_hierarchy();

    hierarchy.set_active(false);
    {
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), TokenHierarchyEventKind::Activity);
        assert_eq!(
            texts(events[0].token_change().unwrap().removed_tokens()),
            ["ab", " ", "cd"]
        );
    }

    let mut sequence = hierarchy.token_sequence();
    assert!(hierarchy.is_active());
    assert_eq!(sequence.token_count().unwrap(), 3);
    assert!(sequence.move_next().unwrap());

    let events = events.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].kind(), TokenHierarchyEventKind::Activity);
}

#[test]
fn rejects_edits_outside_the_text() {
    let (document, events) = document("ab", plain());
    let mut write = document.write();
    assert_eq!(
        write.insert(3, "x"),
        Err(TokenError::OffsetOutOfBounds {
            offset: 3,
            length: 2
        })
    );
    assert!(write.remove(1, 2).is_err());
    assert_eq!(write.text(), "ab");
    drop(write);
    assert!(events.lock().is_empty());
}

#[test]
fn rejects_edits_inside_a_character() {
    let (document, _events) = document("añb", plain());
    assert!(document.write().insert(2, "x").is_err());
    assert!(document.write().insert(3, "x").is_ok());
    assert_eq!(document.read().text(), "añxb");
}

#[derive(Clone, Debug)]
enum Edit {
    Insert(usize, String),
    Remove(usize, usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..64, "[a-c0-9 .+{}]{1,4}").prop_map(|(at, text)| Edit::Insert(at, text)),
        (0usize..64, 1usize..5).prop_map(|(at, len)| Edit::Remove(at, len)),
    ]
}

fn snapshot(hierarchy: &TokenHierarchy) -> Vec<(&'static str, usize, String)> {
    let mut tokens = Vec::new();
    let mut root = hierarchy.token_sequence();
    while root.move_next().unwrap() {
        let token = root.token().unwrap();
        tokens.push((token.id().name(), root.offset().unwrap(), token.text().to_owned()));
        if let Some(mut embedded) = root.embedded().unwrap() {
            while embedded.move_next().unwrap() {
                let token = embedded.token().unwrap();
                tokens.push((
                    token.id().name(),
                    embedded.offset().unwrap(),
                    token.text().to_owned(),
                ));
            }
        }
    }
    tokens
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn incremental_tokens_match_a_fresh_lex(
        initial in "[a-c0-9 .+{}]{0,24}",
        edits in proptest::collection::vec(edit(), 1..8),
    ) {
        let document = Document::builder(initial.as_str(), markup()).build();
        snapshot(document.read().token_hierarchy());

        for edit in edits {
            let mut write = document.write();
            let length = write.text().len();
            match edit {
                Edit::Insert(at, text) => write.insert(at.min(length), &text).unwrap(),
                Edit::Remove(at, len) => {
                    let at = at.min(length);
                    write.remove(at, len.min(length - at)).unwrap();
                }
            }
            drop(write);

            let read = document.read();
            let fresh = TokenHierarchy::builder(read.text(), markup()).build();
            prop_assert_eq!(snapshot(read.token_hierarchy()), snapshot(&fresh));
        }
    }
}
