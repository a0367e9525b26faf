//! Recorded tree mutations
//!
//! Each mutation applied inside a transaction is stored as an [`Operation`]
//! carrying enough state to be undone. Undo applies the inverses in reverse
//! order; redo replays the originals.

use crate::{DocModelError, DocumentTree, Fragment, NodeId, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// A subtree was inserted as child `index` of `parent`
    Insert {
        parent: NodeId,
        index: usize,
        fragment: Fragment,
    },
    /// A subtree was removed from child `index` of `parent`
    Remove {
        parent: NodeId,
        index: usize,
        fragment: Fragment,
    },
    SetAttribute {
        node: NodeId,
        key: String,
        old: Option<String>,
        new: Option<String>,
    },
    InsertText {
        node: NodeId,
        offset: usize,
        text: String,
    },
    RemoveText {
        node: NodeId,
        offset: usize,
        text: String,
    },
}

impl Operation {
    /// Apply this operation to the tree
    pub fn apply(&self, tree: &mut DocumentTree) -> Result<()> {
        match self {
            Operation::Insert {
                parent,
                index,
                fragment,
            } => {
                tree.insert(*parent, *index, fragment.clone())?;
            }
            Operation::Remove {
                parent,
                index,
                fragment,
            } => {
                if tree.children(*parent).get(*index) != Some(&fragment.id) {
                    return Err(DocModelError::TreeStructureError(format!(
                        "node {} is not child {} of {}",
                        fragment.id, index, parent
                    )));
                }
                tree.remove(fragment.id)?;
            }
            Operation::SetAttribute { node, key, new, .. } => {
                tree.set_attribute(*node, key, new.clone())?;
            }
            Operation::InsertText { node, offset, text } => {
                tree.insert_text(*node, *offset, text)?;
            }
            Operation::RemoveText { node, offset, text } => {
                tree.remove_text(*node, *offset, text.chars().count())?;
            }
        }
        Ok(())
    }

    /// The operation that reverts this one
    pub fn inverse(&self) -> Operation {
        match self.clone() {
            Operation::Insert {
                parent,
                index,
                fragment,
            } => Operation::Remove {
                parent,
                index,
                fragment,
            },
            Operation::Remove {
                parent,
                index,
                fragment,
            } => Operation::Insert {
                parent,
                index,
                fragment,
            },
            Operation::SetAttribute {
                node,
                key,
                old,
                new,
            } => Operation::SetAttribute {
                node,
                key,
                old: new,
                new: old,
            },
            Operation::InsertText { node, offset, text } => {
                Operation::RemoveText { node, offset, text }
            }
            Operation::RemoveText { node, offset, text } => {
                Operation::InsertText { node, offset, text }
            }
        }
    }

    /// The node this operation acts on (the subtree root for inserts and
    /// removals)
    pub fn node(&self) -> NodeId {
        match self {
            Operation::Insert { fragment, .. } | Operation::Remove { fragment, .. } => fragment.id,
            Operation::SetAttribute { node, .. }
            | Operation::InsertText { node, .. }
            | Operation::RemoveText { node, .. } => *node,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Operation::Insert { .. } | Operation::Remove { .. })
    }
}
