//! Footnote structure lookups and invariant checks
//!
//! References point at Items by numeric id only. Everything here resolves
//! that id against the current tree; nothing caches node handles across
//! mutations.

use crate::{query_all, query_first, DocumentTree, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Ids
// =============================================================================

/// Parse a stored footnote id. Only plain positive decimal integers qualify.
pub fn parse_footnote_id(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u32>().ok().filter(|&id| id > 0)
}

// =============================================================================
// Lookups
// =============================================================================

/// The footnote section, if the document has one
pub fn footnote_section(tree: &DocumentTree) -> Option<NodeId> {
    query_first(tree, tree.root_id(), |n| n.kind() == NodeKind::Section)
}

/// The footnote list inside the section
pub fn footnote_list(tree: &DocumentTree) -> Option<NodeId> {
    let section = footnote_section(tree)?;
    tree.children(section)
        .iter()
        .copied()
        .find(|&c| tree.kind(c) == Some(NodeKind::List))
}

/// Items of the footnote list in list order
pub fn footnote_items(tree: &DocumentTree) -> Vec<NodeId> {
    footnote_list(tree)
        .map(|list| {
            tree.children(list)
                .iter()
                .copied()
                .filter(|&c| tree.kind(c) == Some(NodeKind::Item))
                .collect()
        })
        .unwrap_or_default()
}

pub fn footnote_count(tree: &DocumentTree) -> usize {
    footnote_items(tree).len()
}

/// The Item carrying `footnote_id`
pub fn item_with_id(tree: &DocumentTree, footnote_id: u32) -> Option<NodeId> {
    footnote_items(tree)
        .into_iter()
        .find(|&item| tree.get(item).and_then(|n| n.footnote_id()) == Some(footnote_id))
}

/// All References in document order
pub fn references(tree: &DocumentTree) -> Vec<NodeId> {
    query_all(tree, tree.root_id(), |n| n.kind() == NodeKind::Reference)
}

/// References whose id equals `footnote_id`
pub fn references_to(tree: &DocumentTree, footnote_id: u32) -> Vec<NodeId> {
    query_all(tree, tree.root_id(), |n| {
        n.kind() == NodeKind::Reference && n.footnote_id() == Some(footnote_id)
    })
}

/// The footnote Item that is `node` or contains it
pub fn enclosing_item(tree: &DocumentTree, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .find(|&n| tree.kind(n) == Some(NodeKind::Item))
        .filter(|&item| {
            tree.parent(item)
                .and_then(|p| tree.kind(p))
                .is_some_and(|k| k == NodeKind::List)
        })
}

// =============================================================================
// Invariants
// =============================================================================

/// The first footnote invariant a document breaks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantBreach {
    #[error("document has {0} footnote sections")]
    MultipleSections(usize),

    #[error("footnote section {section} holds {lists} lists")]
    ListCount { section: NodeId, lists: usize },

    #[error("footnote section exists with an empty list")]
    EmptySection,

    #[error("footnote item {index} has id {found:?}, expected {expected}")]
    Misnumbered {
        index: usize,
        expected: u32,
        found: Option<u32>,
    },

    #[error("reference {node} points at missing footnote {footnote_id:?}")]
    DanglingReference {
        node: NodeId,
        footnote_id: Option<u32>,
    },
}

/// Verify the numbering, reference and section invariants
pub fn check_invariants(tree: &DocumentTree) -> Result<(), InvariantBreach> {
    let sections = query_all(tree, tree.root_id(), |n| n.kind() == NodeKind::Section);
    if sections.len() > 1 {
        return Err(InvariantBreach::MultipleSections(sections.len()));
    }

    if let Some(&section) = sections.first() {
        let lists = tree
            .children(section)
            .iter()
            .filter(|&&c| tree.kind(c) == Some(NodeKind::List))
            .count();
        if lists != 1 {
            return Err(InvariantBreach::ListCount { section, lists });
        }
    }

    let items = footnote_items(tree);
    if footnote_section(tree).is_some() && items.is_empty() {
        return Err(InvariantBreach::EmptySection);
    }

    for (index, &item) in items.iter().enumerate() {
        let expected = index as u32 + 1;
        let found = tree.get(item).and_then(|n| n.footnote_id());
        if found != Some(expected) {
            return Err(InvariantBreach::Misnumbered {
                index,
                expected,
                found,
            });
        }
    }

    let count = items.len() as u32;
    for node in references(tree) {
        let footnote_id = tree.get(node).and_then(|n| n.footnote_id());
        if !footnote_id.is_some_and(|id| id <= count) {
            return Err(InvariantBreach::DanglingReference { node, footnote_id });
        }
    }

    Ok(())
}

// =============================================================================
// Summary
// =============================================================================

/// Footnote ids of a document, for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootnoteSummary {
    /// Item ids in list order
    pub items: Vec<Option<u32>>,
    /// Reference ids in document order
    pub references: Vec<Option<u32>>,
}

impl FootnoteSummary {
    pub fn of(tree: &DocumentTree) -> Self {
        let id_of = |node: NodeId| tree.get(node).and_then(|n| n.footnote_id());
        Self {
            items: footnote_items(tree).into_iter().map(id_of).collect(),
            references: references(tree).into_iter().map(id_of).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fragment;

    fn document(item_ids: &[u32], ref_ids: &[u32]) -> DocumentTree {
        let mut children = vec![Fragment::element("p")
            .with_children(ref_ids.iter().map(|&id| Fragment::reference(id)))];
        if !item_ids.is_empty() {
            children.push(
                Fragment::section().with_child(
                    Fragment::list().with_children(
                        item_ids
                            .iter()
                            .map(|&id| Fragment::item(id).with_child(Fragment::text("body"))),
                    ),
                ),
            );
        }
        DocumentTree::from_fragments(children, Default::default()).unwrap()
    }

    #[test]
    fn test_parse_footnote_id() {
        assert_eq!(parse_footnote_id("12"), Some(12));
        assert_eq!(parse_footnote_id("0"), None);
        assert_eq!(parse_footnote_id("+3"), None);
        assert_eq!(parse_footnote_id("-3"), None);
        assert_eq!(parse_footnote_id(""), None);
        assert_eq!(parse_footnote_id("99999999999"), None);
    }

    #[test]
    fn test_lookups() {
        let tree = document(&[1, 2, 3], &[2, 3, 2]);
        assert_eq!(footnote_count(&tree), 3);
        assert_eq!(references(&tree).len(), 3);
        assert_eq!(references_to(&tree, 2).len(), 2);
        assert!(item_with_id(&tree, 3).is_some());
        assert!(item_with_id(&tree, 4).is_none());

        let item = item_with_id(&tree, 1).unwrap();
        let body = tree.children(item)[0];
        assert_eq!(enclosing_item(&tree, body), Some(item));
        assert_eq!(enclosing_item(&tree, references(&tree)[0]), None);
    }

    #[test]
    fn test_consistent_document_passes() {
        assert_eq!(check_invariants(&document(&[1, 2], &[1, 2, 1])), Ok(()));
        assert_eq!(check_invariants(&document(&[], &[])), Ok(()));
    }

    #[test]
    fn test_breaches_are_reported() {
        assert!(matches!(
            check_invariants(&document(&[1, 3], &[])),
            Err(InvariantBreach::Misnumbered {
                index: 1,
                expected: 2,
                found: Some(3)
            })
        ));
        assert!(matches!(
            check_invariants(&document(&[1], &[2])),
            Err(InvariantBreach::DanglingReference {
                footnote_id: Some(2),
                ..
            })
        ));

        let empty = DocumentTree::from_fragments(
            vec![Fragment::section().with_child(Fragment::list())],
            Default::default(),
        )
        .unwrap();
        assert_eq!(check_invariants(&empty), Err(InvariantBreach::EmptySection));
    }

    #[test]
    fn test_summary() {
        let summary = FootnoteSummary::of(&document(&[1, 2], &[2, 1]));
        assert_eq!(summary.items, vec![Some(1), Some(2)]);
        assert_eq!(summary.references, vec![Some(2), Some(1)]);
    }
}
