//! Delete and backspace handling inside footnote content

use crate::footnote_commands::remove_all_references;
use crate::{EditError, EditingEngine, Result};
use doc_model::{DocumentTree, NodeId, NodeKind, Selection};
use tracing::debug;

/// What a delete key press resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAction {
    /// Not footnote related; the host's default deletion proceeds
    NoOp,
    /// Default deletion is suppressed and nothing changes
    BlockDelete,
    /// The footnote at this list index was deleted with its References
    CascadeDeleteItem(usize),
    /// The footnote section and every Reference were deleted
    CascadeDeleteAll,
}

impl DeleteAction {
    /// Whether the host should still run its default deletion
    pub fn allows_default(&self) -> bool {
        matches!(self, DeleteAction::NoOp)
    }
}

/// Classify a delete key press without changing anything.
///
/// Rules are checked in order and the first match wins.
pub fn classify_delete(tree: &DocumentTree, selection: &Selection) -> Result<DeleteAction> {
    for position in [selection.anchor, selection.focus] {
        if !tree.contains(position.node_id) {
            return Err(EditError::InvalidSelection(format!(
                "node {} is not in the document",
                position.node_id
            )));
        }
    }

    if let Some(selected) = selection.selected {
        if tree.kind(selected) == Some(NodeKind::Section) {
            return Ok(DeleteAction::CascadeDeleteAll);
        }
    }

    let container = selection.anchor.node_id;
    let Some(index) = item_index(tree, container) else {
        return Ok(DeleteAction::NoOp);
    };

    let length = tree.content_length(container);
    let anchor = selection.anchor.offset;
    let focus = selection.focus.offset;

    if length > 1 && anchor <= 1 {
        return Ok(DeleteAction::BlockDelete);
    }

    let whole_item = selection.is_within_one_container()
        && ((anchor == length && focus == 0) || (focus == length && anchor == 0));
    if whole_item || (anchor == 0 && length <= 1) {
        return Ok(DeleteAction::CascadeDeleteItem(index));
    }

    Ok(DeleteAction::NoOp)
}

/// List index of `node` when it is an Item directly inside the footnote list
fn item_index(tree: &DocumentTree, node: NodeId) -> Option<usize> {
    if tree.kind(node) != Some(NodeKind::Item) {
        return None;
    }
    let list = tree.parent(node)?;
    if tree.kind(list) != Some(NodeKind::List) {
        return None;
    }
    tree.children(list)
        .iter()
        .filter(|&&c| tree.kind(c) == Some(NodeKind::Item))
        .position(|&c| c == node)
}

impl EditingEngine {
    /// Handle a delete key press for `selection`, applying any cascade.
    ///
    /// The removal of the Item (or Section) commits first; dropping and
    /// renumbering References runs as a deferred transaction.
    pub fn handle_delete_key(&mut self, selection: &Selection) -> Result<DeleteAction> {
        let action = classify_delete(self.tree()?, selection)?;
        debug!(?action, "delete key");

        match action {
            DeleteAction::CascadeDeleteAll => {
                let section = selection.selected.ok_or_else(|| {
                    EditError::InvalidSelection("no element selected".to_string())
                })?;
                self.change(|w| {
                    w.remove(section)?;
                    w.enqueue(remove_all_references);
                    Ok(())
                })?;
            }
            DeleteAction::CascadeDeleteItem(index) => {
                self.delete_item(index)?;
            }
            DeleteAction::NoOp | DeleteAction::BlockDelete => {}
        }
        Ok(action)
    }
}
