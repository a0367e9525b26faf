//! Undo/redo history of committed batches

use crate::{EditError, Result};
use doc_model::Operation;

/// Manages undo and redo stacks.
///
/// Each entry holds the operations of one batch in the order they were
/// applied. Entries are only moved between the stacks once replaying them
/// has succeeded, so a failed replay leaves the history intact.
#[derive(Debug)]
pub struct UndoManager {
    undo_stack: Vec<Vec<Operation>>,
    redo_stack: Vec<Vec<Operation>>,
    /// Maximum number of undo entries
    max_entries: usize,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::with_limit(100)
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries,
        }
    }

    /// Record a newly committed batch
    pub fn push(&mut self, operations: Vec<Operation>) {
        if operations.is_empty() {
            return;
        }
        self.redo_stack.clear();
        self.undo_stack.push(operations);

        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// The operations that undoing would revert
    pub fn peek_undo(&self) -> Result<&[Operation]> {
        self.undo_stack
            .last()
            .map(Vec::as_slice)
            .ok_or(EditError::UndoStackEmpty)
    }

    /// Move the top undo entry to the redo stack
    pub fn commit_undo(&mut self) {
        if let Some(entry) = self.undo_stack.pop() {
            self.redo_stack.push(entry);
        }
    }

    pub fn peek_redo(&self) -> Result<&[Operation]> {
        self.redo_stack
            .last()
            .map(Vec::as_slice)
            .ok_or(EditError::RedoStackEmpty)
    }

    /// Move the top redo entry back to the undo stack
    pub fn commit_redo(&mut self) {
        if let Some(entry) = self.redo_stack.pop() {
            self.undo_stack.push(entry);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}
