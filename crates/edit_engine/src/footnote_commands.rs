//! Footnote commands
//!
//! Creation, deletion and renumbering of footnotes. Each public engine
//! method runs as one batch; the cascades that keep ids dense run as
//! deferred transactions queued by the transaction that removed an Item.
//!
//! The transaction-level building blocks are exposed as free functions over
//! a [`Writer`] so that input handlers can compose them into their own
//! transactions.

use crate::{EditError, EditingEngine, Result, Writer};
use doc_model::{
    footnote_count, footnote_items, footnote_list, footnote_section, references, references_to,
    Fragment, NodeId, Position, FOOTNOTE_ID_ATTR,
};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use tracing::debug;

/// Result of [`EditingEngine::auto_insert_from_pattern`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoInsert {
    /// A new Item and its Reference were created with this id
    Created(u32),
    /// A Reference to an existing Item was inserted
    Referenced(u32),
    /// The id was out of range; nothing changed
    Ignored,
}

// =============================================================================
// Transaction building blocks
// =============================================================================

/// Append a new footnote and insert its Reference at `position`
pub fn insert_footnote(writer: &mut Writer<'_>, position: Position) -> Result<u32> {
    let tree = writer.tree();
    let list = footnote_list(tree);
    if list.is_none() && footnote_section(tree).is_some() {
        return Err(EditError::InvariantViolation(
            "footnote section has no list".to_string(),
        ));
    }
    let id = footnote_count(tree) as u32 + 1;

    // The Reference goes in first so `position` is resolved against the
    // tree it was computed for.
    writer.insert_at(position, Fragment::reference(id))?;

    let item = Fragment::item(id);
    match list {
        Some(list) => {
            let index = writer.tree().children(list).len();
            writer.insert(list, index, item)?;
        }
        None => {
            let root = writer.tree().root_id();
            let index = writer.tree().children(root).len();
            let section = Fragment::section().with_child(Fragment::list().with_child(item));
            writer.insert(root, index, section)?;
        }
    }
    debug!(footnote_id = id, "inserted footnote");
    Ok(id)
}

/// Insert a Reference to an existing footnote
pub fn insert_reference(writer: &mut Writer<'_>, position: Position, id: u32) -> Result<NodeId> {
    let count = footnote_count(writer.tree());
    if id == 0 || id as usize > count {
        return Err(EditError::InvalidFootnoteId { id, count });
    }
    writer.insert_at(position, Fragment::reference(id))
}

/// Remove the Item at `index` and queue the cascade that restores dense ids.
/// Returns the removed Item's id.
pub fn remove_item(writer: &mut Writer<'_>, index: usize) -> Result<u32> {
    let items = footnote_items(writer.tree());
    let item = *items.get(index).ok_or_else(|| {
        EditError::InvalidCommand(format!(
            "footnote index {} out of range ({} footnotes)",
            index,
            items.len()
        ))
    })?;
    let old_id = index as u32 + 1;

    writer.remove(item)?;
    writer.enqueue(move |w| cascade_item_removal(w, old_id));
    Ok(old_id)
}

/// Follow-up to removing the Item that carried `old_id`: drop its
/// References, shift later ids down by one and remove an emptied section
fn cascade_item_removal(writer: &mut Writer<'_>, old_id: u32) -> Result<()> {
    for reference in references_to(writer.tree(), old_id) {
        writer.remove(reference)?;
    }

    let tree = writer.tree();
    let mut shifted = Vec::new();
    for node in footnote_items(tree).into_iter().chain(references(tree)) {
        if let Some(id) = tree.get(node).and_then(|n| n.footnote_id()) {
            if id > old_id {
                shifted.push((node, id - 1));
            }
        }
    }
    for (node, id) in &shifted {
        writer.set_attribute(*node, FOOTNOTE_ID_ATTR, Some(id.to_string()))?;
    }

    remove_section_if_empty(writer)?;
    debug!(
        footnote_id = old_id,
        renumbered = shifted.len(),
        "cascaded footnote removal"
    );
    Ok(())
}

fn remove_section_if_empty(writer: &mut Writer<'_>) -> Result<()> {
    let tree = writer.tree();
    let Some(section) = footnote_section(tree) else {
        return Ok(());
    };
    if footnote_list(tree).is_none() {
        return Err(EditError::InvariantViolation(
            "footnote section has no list".to_string(),
        ));
    }
    if footnote_items(tree).is_empty() {
        writer.remove(section)?;
    }
    Ok(())
}

/// Remove every Reference in the document
pub fn remove_all_references(writer: &mut Writer<'_>) -> Result<()> {
    for reference in references(writer.tree()) {
        writer.remove(reference)?;
    }
    Ok(())
}

/// Give every Item from `index` on the id matching its position, remapping
/// References from old to new ids in one pass. Returns the number of Items
/// that changed.
///
/// When several Items share an old id, References follow the first of them.
pub fn renumber_from(writer: &mut Writer<'_>, index: usize) -> Result<usize> {
    let tree = writer.tree();
    let items = footnote_items(tree);
    if index > items.len() {
        return Err(EditError::InvalidCommand(format!(
            "footnote index {} out of range ({} footnotes)",
            index,
            items.len()
        )));
    }

    let id_of = |item: NodeId| tree.get(item).and_then(|n| n.footnote_id());

    // Old ids whose References already belong to an earlier Item
    let mut claimed: HashSet<u32> = items[..index].iter().filter_map(|&i| id_of(i)).collect();
    let mut mapping: HashMap<u32, u32> = HashMap::new();
    let mut item_changes = Vec::new();
    for (position, &item) in items.iter().enumerate().skip(index) {
        let expected = position as u32 + 1;
        let current = id_of(item);
        if current != Some(expected) {
            item_changes.push((item, expected));
        }
        if let Some(old) = current {
            if claimed.insert(old) && old != expected {
                mapping.insert(old, expected);
            }
        }
    }

    let reference_changes: Vec<(NodeId, u32)> = references(tree)
        .into_iter()
        .filter_map(|r| {
            let old = tree.get(r).and_then(|n| n.footnote_id())?;
            mapping.get(&old).map(|&new| (r, new))
        })
        .collect();

    for (node, id) in item_changes.iter().chain(&reference_changes) {
        writer.set_attribute(*node, FOOTNOTE_ID_ATTR, Some(id.to_string()))?;
    }
    Ok(item_changes.len())
}

/// Turn a typed footnote id into a footnote or a Reference.
///
/// With `literal`, that range of the position's container is removed first
/// and the Reference takes its place; otherwise it goes at `position`. The
/// candidate is checked against the footnote count at the time this runs.
pub fn auto_insert_from_pattern(
    writer: &mut Writer<'_>,
    candidate: u32,
    position: Position,
    literal: Option<Range<usize>>,
) -> Result<AutoInsert> {
    let count = footnote_count(writer.tree()) as u32;
    let outcome = if candidate == count + 1 {
        AutoInsert::Created(candidate)
    } else if (1..=count).contains(&candidate) {
        AutoInsert::Referenced(candidate)
    } else {
        debug!(candidate, count, "ignored out of range footnote id");
        return Ok(AutoInsert::Ignored);
    };

    let target = match literal {
        Some(range) => {
            writer.remove_range(position.node_id, range.start, range.end)?;
            Position::new(position.node_id, range.start)
        }
        None => position,
    };

    match outcome {
        AutoInsert::Created(_) => {
            insert_footnote(writer, target)?;
        }
        AutoInsert::Referenced(id) => {
            insert_reference(writer, target, id)?;
        }
        AutoInsert::Ignored => {}
    }
    Ok(outcome)
}

// =============================================================================
// Engine operations
// =============================================================================

impl EditingEngine {
    /// Insert a new footnote with a Reference at `position`, returning its id
    pub fn insert_footnote(&mut self, position: Position) -> Result<u32> {
        self.change(|w| insert_footnote(w, position))
    }

    /// Insert a Reference to footnote `id` at `position`
    pub fn insert_reference(&mut self, position: Position, id: u32) -> Result<NodeId> {
        self.change(|w| insert_reference(w, position, id))
    }

    /// Delete the footnote at list `index` with its References
    pub fn delete_item(&mut self, index: usize) -> Result<u32> {
        self.change(|w| remove_item(w, index))
    }

    pub fn renumber_from(&mut self, index: usize) -> Result<usize> {
        self.change(|w| renumber_from(w, index))
    }

    pub fn auto_insert_from_pattern(
        &mut self,
        candidate: u32,
        position: Position,
        literal: Option<Range<usize>>,
    ) -> Result<AutoInsert> {
        self.change(|w| auto_insert_from_pattern(w, candidate, position, literal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{check_invariants, DocumentTree, FootnoteSummary};

    fn engine_with_text(text: &str) -> (EditingEngine, NodeId) {
        let tree = DocumentTree::from_fragments(
            vec![Fragment::element("p").with_child(Fragment::text(text))],
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
    fn test_first_footnote_creates_section() {
        let (mut engine, p) = engine_with_text("Hello world");
        let id = engine.insert_footnote(Position::new(p, 5)).unwrap();
        assert_eq!(id, 1);

        let tree = engine.tree().unwrap();
        assert!(footnote_section(tree).is_some());
        assert_eq!(summary(&engine).items, vec![Some(1)]);
        assert_eq!(summary(&engine).references, vec![Some(1)]);
        assert_eq!(tree.children(p).len(), 3);
        assert_eq!(check_invariants(tree), Ok(()));
    }

    #[test]
    fn test_later_footnotes_append() {
        let (mut engine, p) = engine_with_text("abc");
        engine.insert_footnote(Position::new(p, 3)).unwrap();
        let id = engine.insert_footnote(Position::new(p, 0)).unwrap();
        assert_eq!(id, 2);
        assert_eq!(summary(&engine).items, vec![Some(1), Some(2)]);
        assert_eq!(summary(&engine).references, vec![Some(2), Some(1)]);
    }

    #[test]
    fn test_insert_reference_checks_range() {
        let (mut engine, p) = engine_with_text("abc");
        assert!(matches!(
            engine.insert_reference(Position::new(p, 0), 1),
            Err(EditError::InvalidFootnoteId { id: 1, count: 0 })
        ));
        engine.insert_footnote(Position::new(p, 0)).unwrap();
        engine.insert_reference(Position::new(p, 2), 1).unwrap();
        assert_eq!(summary(&engine).references, vec![Some(1), Some(1)]);
        assert!(!engine.is_poisoned());
    }

    #[test]
    fn test_delete_last_item_removes_section() {
        let (mut engine, p) = engine_with_text("abc");
        engine.insert_footnote(Position::new(p, 1)).unwrap();
        engine.delete_item(0).unwrap();

        let tree = engine.tree().unwrap();
        assert!(footnote_section(tree).is_none());
        assert!(references(tree).is_empty());
        assert_eq!(tree.text_content(p), "abc");
    }

    #[test]
    fn test_delete_item_out_of_range() {
        let (mut engine, _) = engine_with_text("abc");
        assert!(matches!(
            engine.delete_item(0),
            Err(EditError::InvalidCommand(_))
        ));
        assert!(!engine.is_poisoned());
    }

    #[test]
    fn test_renumber_repairs_in_one_pass() {
        let tree = DocumentTree::from_fragments(
            vec![
                Fragment::element("p")
                    .with_child(Fragment::reference(2))
                    .with_child(Fragment::reference(3))
                    .with_child(Fragment::reference(1)),
                Fragment::section().with_child(
                    Fragment::list()
                        .with_child(Fragment::item(1))
                        .with_child(Fragment::item(3))
                        .with_child(Fragment::item(4)),
                ),
            ],
            Default::default(),
        )
        .unwrap();
        let mut engine = EditingEngine::with_tree(tree);

        // 3 -> 2 and 4 -> 3 must not chain into 4 -> 2
        assert_eq!(engine.renumber_from(0).unwrap(), 2);
        assert_eq!(summary(&engine).items, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(summary(&engine).references, vec![Some(2), Some(2), Some(1)]);

        assert_eq!(engine.renumber_from(0).unwrap(), 0);
        assert!(engine.renumber_from(4).is_err());
    }

    fn engine_with_items(item_ids: &[u32], ref_ids: &[u32]) -> EditingEngine {
        let mut p = Fragment::element("p");
        for &id in ref_ids {
            p = p.with_child(Fragment::reference(id));
        }
        let mut list = Fragment::list();
        for &id in item_ids {
            list = list.with_child(Fragment::item(id));
        }
        let tree = DocumentTree::from_fragments(
            vec![p, Fragment::section().with_child(list)],
            Default::default(),
        )
        .unwrap();
        EditingEngine::with_tree(tree)
    }

    #[test]
    fn test_renumber_duplicate_ids_keep_references_on_first_item() {
        let mut engine = engine_with_items(&[1, 1], &[1]);
        assert_eq!(engine.renumber_from(0).unwrap(), 1);
        assert_eq!(summary(&engine).items, vec![Some(1), Some(2)]);
        assert_eq!(summary(&engine).references, vec![Some(1)]);

        let mut engine = engine_with_items(&[1, 1, 2], &[1, 2]);
        assert_eq!(engine.renumber_from(1).unwrap(), 2);
        assert_eq!(summary(&engine).items, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(summary(&engine).references, vec![Some(1), Some(3)]);

        let mut engine = engine_with_items(&[2, 2], &[2]);
        engine.renumber_from(0).unwrap();
        assert_eq!(summary(&engine).items, vec![Some(1), Some(2)]);
        assert_eq!(summary(&engine).references, vec![Some(1)]);
    }

    #[test]
    fn test_section_without_list_is_fatal() {
        let tree = DocumentTree::from_fragments(
            vec![
                Fragment::element("p").with_child(Fragment::text("abc")),
                Fragment::section(),
            ],
            Default::default(),
        )
        .unwrap();
        let p = tree.children(tree.root_id())[0];
        let mut engine = EditingEngine::with_tree(tree);

        assert!(matches!(
            engine.insert_footnote(Position::new(p, 1)),
            Err(EditError::InvariantViolation(_))
        ));
        assert!(!engine.is_poisoned());
    }

    #[test]
    fn test_cascade_on_listless_section_poisons_engine() {
        let mut engine = engine_with_items(&[1], &[1]);
        let outcome = engine.change(|w| {
            let id = remove_item(w, 0)?;
            let list = footnote_list(w.tree()).unwrap();
            w.remove(list)?;
            Ok(id)
        });

        assert!(matches!(outcome, Err(EditError::InvariantViolation(_))));
        assert!(engine.is_poisoned());
        assert!(matches!(engine.renumber_from(0), Err(EditError::NeedsReload)));
    }

    #[test]
    fn test_auto_insert_outcomes() {
        let (mut engine, p) = engine_with_text("abcdef");
        let at = |offset| Position::new(p, offset);

        assert_eq!(
            engine.auto_insert_from_pattern(3, at(0), None).unwrap(),
            AutoInsert::Ignored
        );
        assert_eq!(
            engine.auto_insert_from_pattern(0, at(0), None).unwrap(),
            AutoInsert::Ignored
        );
        assert!(engine.take_reports().is_empty());

        assert_eq!(
            engine.auto_insert_from_pattern(1, at(1), None).unwrap(),
            AutoInsert::Created(1)
        );
        assert_eq!(
            engine.auto_insert_from_pattern(1, at(0), None).unwrap(),
            AutoInsert::Referenced(1)
        );
        assert_eq!(summary(&engine).items, vec![Some(1)]);
        assert_eq!(summary(&engine).references, vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_auto_insert_replaces_literal() {
        let (mut engine, p) = engine_with_text("x[^1]y");
        let outcome = engine
            .auto_insert_from_pattern(1, Position::new(p, 5), Some(1..5))
            .unwrap();
        assert_eq!(outcome, AutoInsert::Created(1));

        let tree = engine.tree().unwrap();
        assert_eq!(tree.text_content(p), "xy");
        assert_eq!(tree.children(p).len(), 3);
        assert_eq!(check_invariants(tree), Ok(()));
    }
}
