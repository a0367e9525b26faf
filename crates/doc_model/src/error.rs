//! Error types for document model operations

use crate::{NodeId, NodeKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocModelError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid position: node {node_id}, offset {offset}")]
    InvalidPosition { node_id: NodeId, offset: usize },

    #[error("Schema violation: {child:?} is not allowed in {parent:?} ({reason})")]
    SchemaViolation {
        parent: NodeKind,
        child: NodeKind,
        reason: String,
    },

    #[error("Attribute '{key}' is not allowed on {kind:?}")]
    DisallowedAttribute { kind: NodeKind, key: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Tree structure error: {0}")]
    TreeStructureError(String),
}

pub type Result<T> = std::result::Result<T, DocModelError>;
