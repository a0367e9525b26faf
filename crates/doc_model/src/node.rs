//! Node identity, node kinds and the stored node record

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Model attribute holding the numeric footnote id of Items and References.
pub const FOOTNOTE_ID_ATTR: &str = "footnoteId";

/// Unique identifier for a node in the document tree.
///
/// Ids survive removal and re-insertion, so recorded operations can be
/// replayed against the tree during undo and redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new random NodeId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enumeration of all node kinds in the document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// The document root
    Root,
    /// The footnote section container (at most one per document)
    Section,
    /// The ordered list of footnote bodies
    List,
    /// One footnote body
    Item,
    /// Inline marker pointing at an Item by id
    Reference,
    /// Character data
    Text,
    /// Any other flow element (paragraphs, emphasis, ...)
    Other,
}

impl NodeKind {
    /// Model name used for kinds that are not `Other`
    pub fn default_name(&self) -> &'static str {
        match self {
            NodeKind::Root => "$root",
            NodeKind::Section => "footNoteSection",
            NodeKind::List => "footNoteList",
            NodeKind::Item => "footNoteItem",
            NodeKind::Reference => "noteHolder",
            NodeKind::Text => "$text",
            NodeKind::Other => "div",
        }
    }

    /// Whether this kind takes part in footnote numbering
    pub fn is_footnote(&self) -> bool {
        matches!(
            self,
            NodeKind::Section | NodeKind::List | NodeKind::Item | NodeKind::Reference
        )
    }

    /// Offsets occupied at the start of a container before its first child.
    ///
    /// Items render their numbering marker there.
    pub fn leading_offset(&self) -> usize {
        match self {
            NodeKind::Item => 1,
            _ => 0,
        }
    }
}

/// A node stored in the document tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    text: String,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        kind: NodeKind,
        name: String,
        attributes: BTreeMap<String, String>,
        text: String,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            parent: None,
            children: Vec::new(),
            attributes,
            text,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Element name (the kind's default name unless this is `Other`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Character data of a Text node (empty for elements)
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// Parsed `footnoteId` attribute, if present and a positive integer
    pub fn footnote_id(&self) -> Option<u32> {
        self.attribute(FOOTNOTE_ID_ATTR).and_then(crate::parse_footnote_id)
    }

    /// Number of offsets this node occupies inside its parent
    pub fn offset_size(&self) -> usize {
        if self.is_text() {
            self.text.chars().count()
        } else {
            1
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.children
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.attributes
    }

    pub(crate) fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }
}
