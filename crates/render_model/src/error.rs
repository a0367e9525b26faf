//! Error types for view conversion

use crate::ViewId;
use doc_model::{DocModelError, NodeId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error(transparent)]
    DocModel(#[from] DocModelError),

    #[error("Model node {0} has no view binding")]
    MissingBinding(NodeId),

    #[error("View node not found: {0}")]
    ViewNodeNotFound(ViewId),

    #[error("Invalid view position: {node}, offset {offset}")]
    InvalidViewPosition { node: ViewId, offset: usize },

    #[error("Invalid view structure: {0}")]
    ViewStructure(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
