//! Error types for editing operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    /// The engine has no document loaded
    #[error("No document is loaded")]
    MissingRoot,

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),

    #[error("Footnote id {id} is out of range (document has {count} footnotes)")]
    InvalidFootnoteId { id: u32, count: usize },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// The footnote structure was found inconsistent while maintaining it
    #[error("Footnote invariant violated: {0}")]
    InvariantViolation(String),

    /// A transaction failed after mutating the tree; the document must be
    /// reloaded before further edits
    #[error("Editing session must be reloaded after a failed transaction")]
    NeedsReload,

    #[error("Undo stack is empty")]
    UndoStackEmpty,

    #[error("Redo stack is empty")]
    RedoStackEmpty,
}

pub type Result<T> = std::result::Result<T, EditError>;
