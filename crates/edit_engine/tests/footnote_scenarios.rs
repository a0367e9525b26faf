//! Integration tests for footnote editing
//!
//! Walks through the end-to-end editing scenarios (insert, cascade delete,
//! typed markup, delete key handling) and checks the numbering invariants
//! over random edit sequences.

use doc_model::{
    check_invariants, footnote_items, footnote_section, references, DocumentTree, FootnoteSummary,
    Fragment, NodeId, Position, Selection,
};
use edit_engine::{
    AutoInsert, DeleteAction, EditingEngine, FootnoteInputHandler, InputEvent, InputHandler,
    Propagation,
};
use proptest::prelude::*;

fn paragraph_engine(text: &str) -> (EditingEngine, NodeId) {
    let tree = DocumentTree::from_fragments(
        vec![Fragment::element("p").with_child(Fragment::text(text))],
        Default::default(),
    )
    .unwrap();
    let p = tree.children(tree.root_id())[0];
    (EditingEngine::with_tree(tree), p)
}

/// A document with Items `1..=bodies.len()` and References with `ref_ids`
fn footnoted_engine(bodies: &[&str], ref_ids: &[u32]) -> (EditingEngine, NodeId) {
    let items = bodies.iter().enumerate().map(|(i, body)| {
        let item = Fragment::item(i as u32 + 1);
        if body.is_empty() {
            item
        } else {
            item.with_child(Fragment::text(*body))
        }
    });
    let tree = DocumentTree::from_fragments(
        vec![
            Fragment::element("p").with_children(ref_ids.iter().map(|&id| Fragment::reference(id))),
            Fragment::section().with_child(Fragment::list().with_children(items)),
        ],
        Default::default(),
    )
    .unwrap();
    let p = tree.children(tree.root_id())[0];
    (EditingEngine::with_tree(tree), p)
}

fn summary(engine: &EditingEngine) -> FootnoteSummary {
    FootnoteSummary::of(engine.tree().unwrap())
}

#[test]
fn scenario_insert_into_empty_document() {
    let (mut engine, p) = paragraph_engine("Claim");
    let id = engine.insert_footnote(Position::new(p, 5)).unwrap();
    assert_eq!(id, 1);

    let tree = engine.tree().unwrap();
    let section = footnote_section(tree).unwrap();
    assert_eq!(tree.parent(section), Some(tree.root_id()));
    assert_eq!(summary(&engine).items, vec![Some(1)]);

    let reference = references(tree)[0];
    assert_eq!(tree.parent(reference), Some(p));
    assert_eq!(tree.index_in_parent(reference), Some(1));
}

#[test]
fn scenario_delete_middle_item() {
    let (mut engine, _) = footnoted_engine(&["one", "two", "three"], &[1, 2, 3, 3, 2]);
    let removed = engine.delete_item(1).unwrap();
    assert_eq!(removed, 2);

    let summary = summary(&engine);
    assert_eq!(summary.items, vec![Some(1), Some(2)]);
    assert_eq!(summary.references, vec![Some(1), Some(2), Some(2)]);

    let tree = engine.tree().unwrap();
    assert_eq!(tree.text_content(footnote_items(tree)[1]), "three");
    assert_eq!(check_invariants(tree), Ok(()));

    let reports = engine.take_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].transactions, 2);
}

#[test]
fn scenario_typed_markup() {
    let (mut engine, p) = paragraph_engine("");
    let mut handler = FootnoteInputHandler::default();

    for (offset, ch) in "See footnote[^1]".chars().enumerate() {
        let event = InputEvent::TextInput {
            position: Position::new(p, offset),
            text: ch.to_string(),
        };
        assert_eq!(handler.handle(&mut engine, &event).unwrap(), Propagation::Stop);
    }

    let tree = engine.tree().unwrap();
    assert_eq!(tree.text_content(p), "See footnote");
    assert_eq!(summary(&engine).items, vec![Some(1)]);
    assert_eq!(summary(&engine).references, vec![Some(1)]);
    assert_eq!(tree.index_in_parent(references(tree)[0]), Some(1));
}

#[test]
fn scenario_caret_at_body_start_blocks_delete() {
    let (mut engine, _) = footnoted_engine(&["Hello"], &[1]);
    let before = engine.tree().unwrap().clone();
    let item = footnote_items(&before)[0];

    let action = engine
        .handle_delete_key(&Selection::collapsed(Position::new(item, 0)))
        .unwrap();
    assert_eq!(action, DeleteAction::BlockDelete);
    assert!(engine.tree().unwrap().same_structure(&before));
    assert!(engine.take_reports().is_empty());
}

#[test]
fn scenario_empty_item_selected_and_deleted() {
    let (mut engine, _) = footnoted_engine(&["first", "", "third"], &[1, 2, 3]);
    let item = footnote_items(engine.tree().unwrap())[1];
    let selection = Selection::new(Position::new(item, 0), Position::new(item, 1));

    let mut handler = FootnoteInputHandler::default();
    let propagation = handler
        .handle(&mut engine, &InputEvent::Delete { selection })
        .unwrap();
    assert_eq!(propagation, Propagation::Stop);

    let summary = summary(&engine);
    assert_eq!(summary.items, vec![Some(1), Some(2)]);
    assert_eq!(summary.references, vec![Some(1), Some(2)]);

    let reports = engine.take_reports();
    assert_eq!(reports[0].transactions, 2);
    assert!(reports[0].operations[0].is_structural());
}

#[test]
fn undo_of_cascade_restores_tree() {
    let (mut engine, _) = footnoted_engine(&["a", "b", "c"], &[3, 1, 2, 3]);
    let before = engine.tree().unwrap().clone();

    engine.delete_item(0).unwrap();
    engine.undo().unwrap();
    assert!(engine.tree().unwrap().same_structure(&before));
    assert_eq!(summary(&engine).references, vec![Some(3), Some(1), Some(2), Some(3)]);
}

#[test]
fn removing_reference_keeps_item() {
    let (mut engine, _) = footnoted_engine(&["body"], &[1]);
    let reference = references(engine.tree().unwrap())[0];
    engine
        .change(|w| w.remove(reference).map(|_| ()))
        .unwrap();

    assert_eq!(summary(&engine).items, vec![Some(1)]);
    assert!(summary(&engine).references.is_empty());
}

#[test]
fn auto_insert_uses_count_at_execution_time() {
    let (mut engine, p) = paragraph_engine("ab");
    // Two detections of id 1 in a row: the second sees the first footnote.
    let first = engine
        .auto_insert_from_pattern(1, Position::new(p, 2), None)
        .unwrap();
    let second = engine
        .auto_insert_from_pattern(1, Position::new(p, 0), None)
        .unwrap();
    assert_eq!(first, AutoInsert::Created(1));
    assert_eq!(second, AutoInsert::Referenced(1));
}

#[derive(Debug, Clone)]
enum Edit {
    Insert(usize),
    Delete(usize),
    Auto(u32),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..40).prop_map(Edit::Insert),
        (0usize..8).prop_map(Edit::Delete),
        (0u32..8).prop_map(Edit::Auto),
    ]
}

proptest! {
    #[test]
    fn ids_stay_dense_under_random_edits(edits in prop::collection::vec(edit(), 1..30)) {
        let (mut engine, p) = paragraph_engine("lorem ipsum dolor");

        for edit in edits {
            let len = engine.tree().unwrap().content_length(p);
            match edit {
                Edit::Insert(offset) => {
                    engine.insert_footnote(Position::new(p, offset % (len + 1))).unwrap();
                }
                Edit::Delete(index) => {
                    let count = footnote_items(engine.tree().unwrap()).len();
                    if index < count {
                        engine.delete_item(index).unwrap();
                    }
                }
                Edit::Auto(candidate) => {
                    engine.auto_insert_from_pattern(candidate, Position::new(p, len), None).unwrap();
                }
            }
            prop_assert_eq!(check_invariants(engine.tree().unwrap()), Ok(()));
        }
    }

    #[test]
    fn delete_item_shifts_exactly_later_ids(
        count in 1u32..6,
        refs in prop::collection::vec(1u32..6, 0..10),
        pick in 0usize..6,
    ) {
        let refs: Vec<u32> = refs.into_iter().filter(|&r| r <= count).collect();
        let bodies: Vec<&str> = (0..count).map(|_| "x").collect();
        let (mut engine, _) = footnoted_engine(&bodies, &refs);
        let index = pick % count as usize;
        let old_id = index as u32 + 1;

        engine.delete_item(index).unwrap();

        let expected: Vec<Option<u32>> = refs
            .iter()
            .filter(|&&r| r != old_id)
            .map(|&r| Some(if r > old_id { r - 1 } else { r }))
            .collect();
        prop_assert_eq!(summary(&engine).references, expected);
        prop_assert_eq!(summary(&engine).items.len(), count as usize - 1);
    }
}
