//! The live editing view
//!
//! [`LiveView`] keeps an editing-mode view tree in step with the document.
//! After each committed batch only the subtrees its operations touched are
//! rebuilt or patched. Operations are projected in order against the
//! document as it stands after the batch, so nodes inserted and removed in
//! the same batch never reach the view.

use crate::rules::{renumber_item_view, renumber_reference_view, Downcaster, ViewMode};
use crate::{RenderError, Result, ViewId, ViewTree};
use doc_model::{
    descendants, references, DocModelError, DocumentTree, Fragment, NodeId, NodeKind, Operation,
    Position, FOOTNOTE_ID_ATTR,
};
use edit_engine::BatchReport;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// A position in the view: an offset into a view element's content, or a
/// character offset into a view text node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPosition {
    pub node: ViewId,
    pub offset: usize,
}

impl ViewPosition {
    pub fn new(node: ViewId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone)]
pub struct LiveView {
    view: ViewTree,
    mode: ViewMode,
    to_view: HashMap<NodeId, ViewId>,
}

impl LiveView {
    /// Build the editing view of `tree`
    pub fn build(tree: &DocumentTree) -> Result<Self> {
        Self::with_mode(tree, ViewMode::Editing)
    }

    pub fn with_mode(tree: &DocumentTree, mode: ViewMode) -> Result<Self> {
        let view = Downcaster::new(tree, mode).build()?;
        let mut live = Self {
            view,
            mode,
            to_view: HashMap::new(),
        };
        live.register(live.view.root());
        Ok(live)
    }

    pub fn view(&self) -> &ViewTree {
        &self.view
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// The view node rendered for a model node
    pub fn model_to_view(&self, node: NodeId) -> Option<ViewId> {
        self.to_view.get(&node).copied()
    }

    fn register(&mut self, built: ViewId) {
        let mut keys = vec![built];
        keys.extend(descendants(&self.view, built));
        for key in keys {
            if let Some(model) = self.view.get(key).and_then(|n| n.model()) {
                self.to_view.insert(model, key);
            }
        }
    }

    fn unrender(&mut self, node: NodeId, touched: &mut BTreeSet<ViewId>) -> Result<()> {
        if let Some(view_id) = self.to_view.remove(&node) {
            if self.view.contains(view_id) {
                self.view.remove(view_id)?;
            }
            touched.insert(view_id);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Incremental update
    // -------------------------------------------------------------------------

    /// Project a committed batch into the view. `tree` is the document after
    /// the batch. Returns the view nodes created, changed or dropped.
    pub fn apply(&mut self, tree: &DocumentTree, report: &BatchReport) -> Result<BTreeSet<ViewId>> {
        let downcaster = Downcaster::new(tree, self.mode);
        let mut touched = BTreeSet::new();
        let mut footnotes_changed = false;

        for op in &report.operations {
            match op {
                Operation::Insert { fragment, .. } => {
                    footnotes_changed |= has_footnote_nodes(fragment);
                    self.render_node(tree, &downcaster, fragment.id, &mut touched)?;
                }
                Operation::Remove { fragment, .. } => {
                    footnotes_changed |= has_footnote_nodes(fragment);
                    let mut stack = vec![fragment];
                    while let Some(f) = stack.pop() {
                        self.unrender(f.id, &mut touched)?;
                        stack.extend(f.children.iter());
                    }
                }
                Operation::SetAttribute { node, key, .. } => {
                    footnotes_changed |= key == FOOTNOTE_ID_ATTR;
                    self.update_attribute(tree, &downcaster, *node, key, &mut touched)?;
                }
                Operation::InsertText { node, .. } | Operation::RemoveText { node, .. } => {
                    self.refresh_text(tree, *node, &mut touched)?;
                }
            }
        }

        if footnotes_changed {
            self.reconcile_references(tree, &downcaster, &mut touched)?;
        }
        debug!(
            operations = report.operations.len(),
            touched = touched.len(),
            "projected batch into live view"
        );
        Ok(touched)
    }

    /// Render a model node that has no view yet
    fn render_node(
        &mut self,
        tree: &DocumentTree,
        downcaster: &Downcaster<'_>,
        node: NodeId,
        touched: &mut BTreeSet<ViewId>,
    ) -> Result<()> {
        if !tree.contains(node) || self.to_view.contains_key(&node) {
            return Ok(());
        }
        let Some(parent) = tree.parent(node) else {
            return Ok(());
        };
        let Some(&parent_view) = self.to_view.get(&parent) else {
            // Rendered along with its ancestor, or the ancestor is absent
            return Ok(());
        };

        let index = self.placement(tree, parent, parent_view, node);
        if let Some(built) = downcaster.build_node(&mut self.view, parent_view, index, node)? {
            self.register(built);
            touched.insert(built);
        }
        Ok(())
    }

    /// View index right after the nearest preceding rendered sibling
    fn placement(&self, tree: &DocumentTree, parent: NodeId, parent_view: ViewId, node: NodeId) -> usize {
        let siblings = tree.children(parent);
        let before = siblings.iter().position(|&s| s == node).unwrap_or(0);
        for sibling in siblings[..before].iter().rev() {
            let Some(&view_id) = self.to_view.get(sibling) else {
                continue;
            };
            if self.view.parent(view_id) == Some(parent_view) {
                if let Some(index) = self.view.index_in_parent(view_id) {
                    return index + 1;
                }
            }
        }
        // Skip decorations that precede the content, like an Item's prefix
        self.view
            .children(parent_view)
            .iter()
            .take_while(|&&c| self.view.get(c).is_some_and(|n| n.model().is_none()))
            .count()
    }

    fn update_attribute(
        &mut self,
        tree: &DocumentTree,
        downcaster: &Downcaster<'_>,
        node: NodeId,
        key: &str,
        touched: &mut BTreeSet<ViewId>,
    ) -> Result<()> {
        let (Some(&view_id), Some(model)) = (self.to_view.get(&node), tree.get(node)) else {
            return Ok(());
        };
        let footnote_id = model.attribute(FOOTNOTE_ID_ATTR).unwrap_or_default();

        match model.kind() {
            NodeKind::Item if key == FOOTNOTE_ID_ATTR => {
                renumber_item_view(&mut self.view, view_id, footnote_id)?;
            }
            NodeKind::Reference if key == FOOTNOTE_ID_ATTR => {
                if downcaster.is_orphan(model) {
                    return self.unrender(node, touched);
                }
                renumber_reference_view(&mut self.view, view_id, footnote_id)?;
            }
            NodeKind::Other => {
                self.view.set_attribute(view_id, key, model.attribute(key))?;
            }
            _ => return Ok(()),
        }
        touched.insert(view_id);
        Ok(())
    }

    fn refresh_text(
        &mut self,
        tree: &DocumentTree,
        node: NodeId,
        touched: &mut BTreeSet<ViewId>,
    ) -> Result<()> {
        let (Some(&view_id), Some(model)) = (self.to_view.get(&node), tree.get(node)) else {
            return Ok(());
        };
        if model.is_text() {
            self.view.set_text(view_id, model.text())?;
            touched.insert(view_id);
        }
        Ok(())
    }

    /// Show References whose Item appeared and hide those whose Item went
    /// away
    fn reconcile_references(
        &mut self,
        tree: &DocumentTree,
        downcaster: &Downcaster<'_>,
        touched: &mut BTreeSet<ViewId>,
    ) -> Result<()> {
        for reference in references(tree) {
            let node = tree.node(reference)?;
            let shown = self.to_view.contains_key(&reference);
            match (downcaster.is_orphan(node), shown) {
                (true, true) => self.unrender(reference, touched)?,
                (false, false) => self.render_node(tree, downcaster, reference, touched)?,
                _ => {}
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Position mapping
    // -------------------------------------------------------------------------

    /// Map a view position to the model.
    ///
    /// Positions inside a rendered Reference land right after the Reference;
    /// positions inside an Item's numbering prefix land at the start of the
    /// Item body.
    pub fn view_to_model(&self, tree: &DocumentTree, position: ViewPosition) -> Result<Position> {
        let invalid = || RenderError::InvalidViewPosition {
            node: position.node,
            offset: position.offset,
        };

        let mut current = position.node;
        let mut inner_child = None;
        let model = loop {
            let node = self.view.node(current)?;
            if let Some(model) = node.model() {
                break model;
            }
            inner_child = Some(current);
            current = node.parent().ok_or_else(invalid)?;
        };
        let bound = current;
        let model_node = tree.node(model)?;

        if model_node.kind() == NodeKind::Reference {
            return tree
                .position_after(model)
                .ok_or_else(|| DocModelError::NodeNotFound(model).into());
        }
        if inner_child.is_some() {
            // Inside a decoration such as the Item prefix
            return Ok(Position::new(model, model_node.kind().leading_offset()));
        }

        if model_node.is_text() {
            if position.offset > model_node.offset_size() {
                return Err(invalid());
            }
            let parent = tree.parent(model).ok_or(DocModelError::NodeNotFound(model))?;
            let index = tree
                .index_in_parent(model)
                .ok_or(DocModelError::NodeNotFound(model))?;
            return Ok(Position::new(
                parent,
                tree.child_offset(parent, index) + position.offset,
            ));
        }

        let (index, inner) = self.view.locate(bound, position.offset).ok_or_else(invalid)?;
        let Some(&child) = self.view.children(bound).get(index) else {
            return Ok(Position::new(model, tree.content_length(model)));
        };
        match self.view.node(child)?.model() {
            Some(child_model) => {
                let before = tree
                    .position_before(child_model)
                    .ok_or(DocModelError::NodeNotFound(child_model))?;
                Ok(Position::new(model, before.offset + inner))
            }
            None => Ok(Position::new(model, model_node.kind().leading_offset())),
        }
    }
}

fn has_footnote_nodes(fragment: &Fragment) -> bool {
    matches!(fragment.kind, NodeKind::Section | NodeKind::List | NodeKind::Item)
        || fragment.children.iter().any(has_footnote_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{footnote_items, query_first};
    use edit_engine::EditingEngine;

    fn engine_with(fragments: Vec<Fragment>) -> (EditingEngine, NodeId) {
        let tree = DocumentTree::from_fragments(fragments, Default::default()).unwrap();
        let p = tree.children(tree.root_id())[0];
        (EditingEngine::with_tree(tree), p)
    }

    fn footnoted() -> (EditingEngine, NodeId) {
        engine_with(vec![
            Fragment::element("p")
                .with_child(Fragment::text("ab"))
                .with_child(Fragment::reference(1))
                .with_child(Fragment::text("cd"))
                .with_child(Fragment::reference(2)),
            Fragment::section().with_child(
                Fragment::list()
                    .with_child(Fragment::item(1).with_child(Fragment::text("one")))
                    .with_child(Fragment::item(2).with_child(Fragment::text("two"))),
            ),
        ])
    }

    fn sync(live: &mut LiveView, engine: &mut EditingEngine) -> BTreeSet<ViewId> {
        let mut touched = BTreeSet::new();
        for report in engine.take_reports() {
            touched.extend(live.apply(engine.tree().unwrap(), &report).unwrap());
        }
        let fresh = LiveView::build(engine.tree().unwrap()).unwrap();
        assert!(live.view().same_structure(fresh.view()));
        touched
    }

    #[test]
    fn test_insert_footnote_is_projected() {
        let (mut engine, p) = engine_with(vec![Fragment::element("p").with_child(Fragment::text("abc"))]);
        let mut live = LiveView::build(engine.tree().unwrap()).unwrap();

        engine.insert_footnote(Position::new(p, 1)).unwrap();
        let touched = sync(&mut live, &mut engine);
        assert!(!touched.is_empty());
    }

    #[test]
    fn test_cascade_delete_patches_only_affected_nodes() {
        let (mut engine, p) = footnoted();
        let mut live = LiveView::build(engine.tree().unwrap()).unwrap();
        let first_text = live
            .model_to_view(engine.tree().unwrap().children(p)[0])
            .unwrap();

        engine.delete_item(0).unwrap();
        let touched = sync(&mut live, &mut engine);
        assert!(!touched.contains(&first_text));

        let tree = engine.tree().unwrap();
        let item = footnote_items(tree)[0];
        let item_view = live.model_to_view(item).unwrap();
        assert_eq!(live.view().text_content(item_view), "1. two");
    }

    #[test]
    fn test_undo_and_redo_are_projected() {
        let (mut engine, _) = footnoted();
        let mut live = LiveView::build(engine.tree().unwrap()).unwrap();

        engine.delete_item(1).unwrap();
        sync(&mut live, &mut engine);
        engine.undo().unwrap();
        sync(&mut live, &mut engine);
        engine.redo().unwrap();
        sync(&mut live, &mut engine);
    }

    #[test]
    fn test_orphan_appears_once_item_exists() {
        let (mut engine, p) = engine_with(vec![Fragment::element("p")
            .with_child(Fragment::text("x"))
            .with_child(Fragment::reference(1))]);
        let mut live = LiveView::build(engine.tree().unwrap()).unwrap();
        let orphan = engine.tree().unwrap().children(p)[1];
        assert_eq!(live.model_to_view(orphan), None);

        engine.insert_footnote(Position::new(p, 0)).unwrap();
        sync(&mut live, &mut engine);
        assert!(live.model_to_view(orphan).is_some());
    }

    #[test]
    fn test_typed_text_refreshes_text_node() {
        let (mut engine, p) = footnoted();
        let mut live = LiveView::build(engine.tree().unwrap()).unwrap();
        let text = engine.tree().unwrap().children(p)[0];

        engine
            .change(|w| w.insert_text(Position::new(p, 2), "Z"))
            .unwrap();
        let touched = sync(&mut live, &mut engine);
        let text_view = live.model_to_view(text).unwrap();
        assert!(touched.contains(&text_view));
        assert_eq!(live.view().get(text_view).unwrap().text(), Some("abZ"));
    }

    #[test]
    fn test_view_to_model_mapping() {
        let (engine, p) = footnoted();
        let tree = engine.tree().unwrap();
        let live = LiveView::build(tree).unwrap();
        let view = live.view();

        // Inside the rendered label of the first Reference
        let reference = tree.children(p)[1];
        let holder = live.model_to_view(reference).unwrap();
        let label = query_first(view, holder, |n| n.is_text()).unwrap();
        assert_eq!(
            live.view_to_model(tree, ViewPosition::new(label, 1)).unwrap(),
            Position::new(p, 3)
        );
        assert_eq!(
            live.view_to_model(tree, ViewPosition::new(holder, 0)).unwrap(),
            Position::new(p, 3)
        );

        // Inside the numbering prefix of an Item
        let item = footnote_items(tree)[0];
        let item_view = live.model_to_view(item).unwrap();
        let prefix = view.children(item_view)[0];
        assert_eq!(
            live.view_to_model(tree, ViewPosition::new(prefix, 2)).unwrap(),
            Position::new(item, 1)
        );
        assert_eq!(
            live.view_to_model(tree, ViewPosition::new(item_view, 1)).unwrap(),
            Position::new(item, 1)
        );

        // Plain text and element offsets
        let text = live.model_to_view(tree.children(p)[2]).unwrap();
        assert_eq!(
            live.view_to_model(tree, ViewPosition::new(text, 1)).unwrap(),
            Position::new(p, 4)
        );
        let p_view = live.model_to_view(p).unwrap();
        assert_eq!(
            live.view_to_model(tree, ViewPosition::new(p_view, 6)).unwrap(),
            Position::new(p, 6)
        );
        assert!(live
            .view_to_model(tree, ViewPosition::new(text, 9))
            .is_err());
    }
}
