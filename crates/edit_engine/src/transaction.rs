//! Transactions and the writer handed to them
//!
//! Every tree mutation goes through a [`Writer`], which applies it and
//! records the [`Operation`] for undo and view projection. A writer can also
//! queue follow-up changes; the engine runs those after the current
//! transaction has committed, in the order they were queued.

use crate::Result;
use doc_model::{DocModelError, DocumentTree, Fragment, Location, NodeId, Operation, Position};

/// A change queued to run after the current transaction commits
pub type DeferredChange = Box<dyn for<'w> FnOnce(&mut Writer<'w>) -> Result<()>>;

/// Mutation access to the tree for the duration of one transaction
pub struct Writer<'a> {
    tree: &'a mut DocumentTree,
    operations: Vec<Operation>,
    deferred: Vec<DeferredChange>,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(tree: &'a mut DocumentTree) -> Self {
        Self {
            tree,
            operations: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// Read access to the tree in its current, partially changed state
    pub fn tree(&self) -> &DocumentTree {
        &*self.tree
    }

    /// Operations applied so far in this transaction
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn insert(&mut self, parent: NodeId, index: usize, fragment: Fragment) -> Result<NodeId> {
        let record = fragment.clone();
        let id = self.tree.insert(parent, index, fragment)?;
        self.operations.push(Operation::Insert {
            parent,
            index,
            fragment: record,
        });
        Ok(id)
    }

    /// Insert at a container position, splitting a text node if the position
    /// falls inside one
    pub fn insert_at(&mut self, position: Position, fragment: Fragment) -> Result<NodeId> {
        let container = position.node_id;
        match self.tree.locate(position)? {
            Location::Between { index } => self.insert(container, index, fragment),
            Location::InText {
                index,
                node,
                offset,
            } => {
                self.tree.check_insert(container, &fragment)?;
                let len = self.tree.offset_size(node);
                let tail = self.remove_text(node, offset, len - offset)?;
                let id = self.insert(container, index + 1, fragment)?;
                self.insert(container, index + 2, Fragment::text(tail))?;
                Ok(id)
            }
        }
    }

    /// Remove a node with its subtree, returning what was removed
    pub fn remove(&mut self, node: NodeId) -> Result<Fragment> {
        let removed = self.tree.remove(node)?;
        self.operations.push(Operation::Remove {
            parent: removed.parent,
            index: removed.index,
            fragment: removed.fragment.clone(),
        });
        Ok(removed.fragment)
    }

    /// Set or clear an attribute. Setting the current value records nothing.
    pub fn set_attribute(&mut self, node: NodeId, key: &str, value: Option<String>) -> Result<()> {
        let old = self.tree.set_attribute(node, key, value.clone())?;
        if old != value {
            self.operations.push(Operation::SetAttribute {
                node,
                key: key.to_string(),
                old,
                new: value,
            });
        }
        Ok(())
    }

    /// Type `text` at a container position. Text joins an adjacent text
    /// node when there is one.
    pub fn insert_text(&mut self, position: Position, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let container = position.node_id;
        match self.tree.locate(position)? {
            Location::InText { node, offset, .. } => self.insert_text_into(node, offset, text),
            Location::Between { index } => {
                let children = self.tree.children(container);
                let before = index.checked_sub(1).and_then(|i| children.get(i)).copied();
                let after = children.get(index).copied();

                if let Some(prev) = before.filter(|&n| self.is_text(n)) {
                    let end = self.tree.offset_size(prev);
                    self.insert_text_into(prev, end, text)
                } else if let Some(next) = after.filter(|&n| self.is_text(n)) {
                    self.insert_text_into(next, 0, text)
                } else {
                    self.insert(container, index, Fragment::text(text)).map(|_| ())
                }
            }
        }
    }

    fn is_text(&self, node: NodeId) -> bool {
        self.tree.get(node).is_some_and(|n| n.is_text())
    }

    fn insert_text_into(&mut self, node: NodeId, offset: usize, text: &str) -> Result<()> {
        self.tree.insert_text(node, offset, text)?;
        self.operations.push(Operation::InsertText {
            node,
            offset,
            text: text.to_string(),
        });
        Ok(())
    }

    pub fn remove_text(&mut self, node: NodeId, offset: usize, len: usize) -> Result<String> {
        let removed = self.tree.remove_text(node, offset, len)?;
        self.operations.push(Operation::RemoveText {
            node,
            offset,
            text: removed.clone(),
        });
        Ok(removed)
    }

    /// Remove everything between two offsets of a container. Text nodes
    /// that are only partly covered are trimmed; other children must be
    /// covered whole.
    pub fn remove_range(&mut self, container: NodeId, start: usize, end: usize) -> Result<()> {
        if start > end || end > self.tree.content_length(container) {
            return Err(DocModelError::InvalidPosition {
                node_id: container,
                offset: end,
            }
            .into());
        }

        let mut offset = self.tree.child_offset(container, 0);
        let mut spans = Vec::new();
        for &child in self.tree.children(container) {
            let size = self.tree.offset_size(child);
            let (lo, hi) = (start.max(offset), end.min(offset + size));
            if lo < hi {
                spans.push((child, lo - offset, hi - lo, size));
            }
            offset += size;
        }

        for (child, from, len, size) in spans.into_iter().rev() {
            if from == 0 && len == size {
                self.remove(child)?;
            } else if self.is_text(child) {
                self.remove_text(child, from, len)?;
            } else {
                return Err(DocModelError::InvalidPosition {
                    node_id: container,
                    offset: start,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Queue a change to run once this transaction has committed
    pub fn enqueue<F>(&mut self, change: F)
    where
        F: for<'w> FnOnce(&mut Writer<'w>) -> Result<()> + 'static,
    {
        self.deferred.push(Box::new(change));
    }

    pub(crate) fn finish(self) -> (Vec<Operation>, Vec<DeferredChange>) {
        (self.operations, self.deferred)
    }
}
