//! Selection model - caret position, ranges and element selection

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// A position in the document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// The container node holding this position
    pub node_id: NodeId,
    /// Offset among the container's content (one per character of a text
    /// child, one per element child, plus any leading marker)
    pub offset: usize,
}

impl Position {
    pub fn new(node_id: NodeId, offset: usize) -> Self {
        Self { node_id, offset }
    }
}

/// A selection in the document
///
/// A selection has an anchor (where the selection started) and a focus
/// (where the caret is). When anchor == focus the selection is collapsed.
/// An element selected as a whole (a widget such as the footnote section)
/// is reported through `selected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
    #[serde(default)]
    pub selected: Option<NodeId>,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self {
            anchor,
            focus,
            selected: None,
        }
    }

    /// Create a collapsed selection (caret only)
    pub fn collapsed(position: Position) -> Self {
        Self::new(position, position)
    }

    /// Select one element as a whole. `before` and `after` are the
    /// positions around it in its parent.
    pub fn element(node_id: NodeId, before: Position, after: Position) -> Self {
        Self {
            anchor: before,
            focus: after,
            selected: Some(node_id),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Whether anchor and focus share one container
    pub fn is_within_one_container(&self) -> bool {
        self.anchor.node_id == self.focus.node_id
    }

    /// Check if the selection goes forward (anchor before focus).
    /// Only meaningful within a single container.
    pub fn is_forward(&self) -> bool {
        self.is_within_one_container() && self.anchor.offset <= self.focus.offset
    }

    /// Start of the selection regardless of direction
    pub fn start(&self) -> Position {
        if self.is_forward() {
            self.anchor
        } else {
            self.focus
        }
    }

    /// End of the selection regardless of direction
    pub fn end(&self) -> Position {
        if self.is_forward() {
            self.focus
        } else {
            self.anchor
        }
    }
}
