//! Transaction execution engine

use crate::{DeferredChange, EditError, FootnoteConfig, Result, UndoManager, Writer};
use doc_model::{check_invariants, DocumentTree, Operation};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Operations committed by one batch: a transaction plus every deferred
/// transaction it queued, directly or indirectly
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub operations: Vec<Operation>,
    /// Number of transactions that ran in the batch
    pub transactions: usize,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// The main editing engine that owns the document and serializes changes
pub struct EditingEngine {
    /// Current document tree; `None` until a document is loaded
    tree: Option<DocumentTree>,
    undo_manager: UndoManager,
    config: FootnoteConfig,
    /// Changes queued by committed transactions, run in FIFO order
    pending: VecDeque<DeferredChange>,
    /// Committed batches not yet taken by a view
    reports: Vec<BatchReport>,
    /// Set when a failed transaction left partial changes behind
    poisoned: bool,
}

impl EditingEngine {
    /// Create an engine editing an empty document
    pub fn new() -> Self {
        Self::with_tree(DocumentTree::new())
    }

    pub fn with_tree(tree: DocumentTree) -> Self {
        Self::with_config(tree, FootnoteConfig::default())
    }

    pub fn with_config(tree: DocumentTree, config: FootnoteConfig) -> Self {
        let mut engine = Self::unloaded(config);
        engine.tree = Some(tree);
        engine
    }

    /// Create an engine with no document; every edit fails with
    /// [`EditError::MissingRoot`] until [`load`](Self::load) is called
    pub fn unloaded(config: FootnoteConfig) -> Self {
        Self {
            tree: None,
            undo_manager: UndoManager::with_limit(config.undo_limit),
            config,
            pending: VecDeque::new(),
            reports: Vec::new(),
            poisoned: false,
        }
    }

    /// Replace the document, dropping history and any poisoned state
    pub fn load(&mut self, tree: DocumentTree) {
        self.tree = Some(tree);
        self.undo_manager.clear();
        self.pending.clear();
        self.reports.clear();
        self.poisoned = false;
    }

    pub fn tree(&self) -> Result<&DocumentTree> {
        self.tree.as_ref().ok_or(EditError::MissingRoot)
    }

    pub fn config(&self) -> &FootnoteConfig {
        &self.config
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Take the batches committed since the last call, oldest first
    pub fn take_reports(&mut self) -> Vec<BatchReport> {
        std::mem::take(&mut self.reports)
    }

    fn writable_tree(&mut self) -> Result<&mut DocumentTree> {
        if self.poisoned {
            return Err(EditError::NeedsReload);
        }
        self.tree.as_mut().ok_or(EditError::MissingRoot)
    }

    /// Run `f` as one transaction, then drain the changes it queued.
    ///
    /// The whole batch becomes one undo entry and one [`BatchReport`].
    pub fn change<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Writer<'_>) -> Result<T>,
    {
        let tree = self.writable_tree()?;
        let mut writer = Writer::new(tree);
        let outcome = f(&mut writer);
        let (mut operations, deferred) = writer.finish();

        let value = match outcome {
            Ok(value) => value,
            Err(err) => return Err(self.abort(err, !operations.is_empty())),
        };
        self.pending.extend(deferred);

        let mut transactions = 1;
        while let Some(change) = self.pending.pop_front() {
            let tree = self.writable_tree()?;
            let mut writer = Writer::new(tree);
            let outcome = change(&mut writer);
            let (ops, deferred) = writer.finish();
            operations.extend(ops);

            if let Err(err) = outcome {
                return Err(self.abort(err, !operations.is_empty()));
            }
            self.pending.extend(deferred);
            transactions += 1;
        }

        self.commit(operations, transactions);
        Ok(value)
    }

    fn abort(&mut self, err: EditError, applied: bool) -> EditError {
        self.pending.clear();
        if applied {
            warn!(error = %err, "transaction failed after mutating the document");
            self.poisoned = true;
        }
        err
    }

    fn commit(&mut self, operations: Vec<Operation>, transactions: usize) {
        if operations.is_empty() {
            return;
        }
        debug!(
            operations = operations.len(),
            transactions, "committed batch"
        );
        if let Some(tree) = &self.tree {
            if let Err(breach) = check_invariants(tree) {
                debug!(%breach, "footnote invariants do not hold after batch");
            }
        }
        self.undo_manager.push(operations.clone());
        self.reports.push(BatchReport {
            operations,
            transactions,
        });
    }

    /// Revert the last batch
    pub fn undo(&mut self) -> Result<()> {
        let inverse: Vec<Operation> = self
            .undo_manager
            .peek_undo()?
            .iter()
            .rev()
            .map(Operation::inverse)
            .collect();
        self.replay(inverse)?;
        self.undo_manager.commit_undo();
        Ok(())
    }

    /// Re-apply the last undone batch
    pub fn redo(&mut self) -> Result<()> {
        let operations = self.undo_manager.peek_redo()?.to_vec();
        self.replay(operations)?;
        self.undo_manager.commit_redo();
        Ok(())
    }

    fn replay(&mut self, operations: Vec<Operation>) -> Result<()> {
        let tree = self.writable_tree()?;
        for (applied, op) in operations.iter().enumerate() {
            if let Err(err) = op.apply(tree) {
                return Err(self.abort(err.into(), applied > 0));
            }
        }
        self.reports.push(BatchReport {
            operations,
            transactions: 1,
        });
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.undo_manager.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_manager.can_redo()
    }
}

impl Default for EditingEngine {
    fn default() -> Self {
        Self::new()
    }
}
