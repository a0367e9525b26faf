//! Persisted markup round trips for normalized documents

use doc_model::{check_invariants, DocumentTree, Fragment};
use proptest::prelude::*;
use std::collections::BTreeMap;
use store::{load_document, normalize_markup, save_document};

#[derive(Debug, Clone)]
enum Inline {
    Text(String),
    Reference(u32),
}

fn attributes() -> impl Strategy<Value = BTreeMap<String, String>> {
    let key = prop_oneof![
        Just("class"),
        Just("title"),
        Just("lang"),
        Just("contenteditable"),
        Just("data-note"),
    ]
    .prop_map(str::to_string);
    prop::collection::btree_map(key, "[a-z &<\"-]{0,8}", 0..3)
}

fn paragraph(items: u32) -> impl Strategy<Value = Fragment> {
    let inline = if items == 0 {
        "[a-z &<>\"]{1,8}".prop_map(Inline::Text).boxed()
    } else {
        prop_oneof![
            "[a-z &<>\"]{1,8}".prop_map(Inline::Text),
            (1..=items).prop_map(Inline::Reference),
        ]
        .boxed()
    };
    (attributes(), prop::collection::vec(inline, 0..6)).prop_map(|(attributes, inlines)| {
        let mut p = Fragment::element("p").with_children(inlines.into_iter().map(|i| match i {
            Inline::Text(text) => Fragment::text(text),
            Inline::Reference(id) => Fragment::reference(id),
        }));
        p.attributes = attributes;
        p.normalize();
        p
    })
}

fn document() -> impl Strategy<Value = DocumentTree> {
    (0u32..4).prop_flat_map(|items| {
        (
            prop::collection::vec(paragraph(items), 1..4),
            prop::collection::vec("[a-z0-9. ]{0,10}", items as usize),
        )
            .prop_map(move |(paragraphs, bodies)| {
                let mut content = paragraphs;
                if items > 0 {
                    let list = Fragment::list().with_children(bodies.into_iter().enumerate().map(
                        |(i, body)| {
                            let item = Fragment::item(i as u32 + 1);
                            if body.is_empty() {
                                item
                            } else {
                                item.with_child(Fragment::text(body))
                            }
                        },
                    ));
                    content.push(Fragment::section().with_child(list));
                }
                DocumentTree::from_fragments(content, Default::default()).unwrap()
            })
    })
}

proptest! {
    #[test]
    fn persisted_markup_round_trips(tree in document()) {
        let markup = save_document(&tree).unwrap();
        let loaded = load_document(&markup).unwrap();
        prop_assert!(loaded.skipped.is_empty());
        prop_assert!(loaded.tree.same_structure(&tree));
        prop_assert_eq!(check_invariants(&loaded.tree), Ok(()));
    }

    #[test]
    fn normalizing_is_idempotent(tree in document()) {
        let markup = save_document(&tree).unwrap();
        prop_assert_eq!(normalize_markup(&markup).unwrap(), markup);
    }
}

#[test]
fn skipped_elements_do_not_stop_conversion() {
    let markup = concat!(
        "<p>before</p>\n",
        "<span class=\"footnote-item\" data-footnote-id=\"1\">1. stray</span>\n",
        "<p>after</p>"
    );
    let loaded = load_document(markup).unwrap();
    assert_eq!(loaded.skipped.len(), 1);
    let tree = &loaded.tree;
    assert_eq!(tree.children(tree.root_id()).len(), 2);
}
