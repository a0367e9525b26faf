//! Document tree storage and structural operations

use crate::{DocModelError, Fragment, Hierarchy, Node, NodeId, NodeKind, Position, Result, Schema};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A subtree detached by [`DocumentTree::remove`]
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    /// Parent the subtree was detached from
    pub parent: NodeId,
    /// Child index it occupied
    pub index: usize,
    pub fragment: Fragment,
}

/// Where a position falls among the children of its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Between children, right before child `index`
    Between { index: usize },
    /// Strictly inside the text node at child `index`
    InText {
        index: usize,
        node: NodeId,
        offset: usize,
    },
}

/// The complete document tree structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTree {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    #[serde(skip)]
    schema: Schema,
}

impl DocumentTree {
    /// Create an empty document governed by the default footnote schema
    pub fn new() -> Self {
        Self::with_schema(Schema::default())
    }

    pub fn with_schema(schema: Schema) -> Self {
        let root = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node::new(
                root,
                NodeKind::Root,
                NodeKind::Root.default_name().to_string(),
                Default::default(),
                String::new(),
            ),
        );
        Self {
            root,
            nodes,
            schema,
        }
    }

    /// Build a document whose root holds the given top-level fragments
    pub fn from_fragments(children: Vec<Fragment>, schema: Schema) -> Result<Self> {
        let mut tree = Self::with_schema(schema);
        let root = tree.root;
        for (index, child) in children.into_iter().enumerate() {
            tree.insert(root, index, child)?;
        }
        Ok(tree)
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Like [`get`](Self::get), but a missing node is an error
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(DocModelError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Total number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Ancestor chain, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.parent(node);
        }
        chain
    }

    /// Kinds of `id` and all of its ancestors, `id` first
    fn kind_chain(&self, id: NodeId) -> Vec<NodeKind> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|n| self.kind(n))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Structural mutation
    // -------------------------------------------------------------------------

    /// Insert a subtree as child `index` of `parent`.
    ///
    /// The whole fragment is validated against the schema first; on failure
    /// the tree is left untouched.
    pub fn insert(&mut self, parent: NodeId, index: usize, fragment: Fragment) -> Result<NodeId> {
        let child_count = self.node(parent)?.children().len();
        if index > child_count {
            return Err(DocModelError::InvalidPosition {
                node_id: parent,
                offset: index,
            });
        }
        self.check_insert(parent, &fragment)?;

        let id = self.attach(fragment, parent);
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children_mut().insert(index, id);
        }
        Ok(id)
    }

    /// Check that `fragment` could be inserted under `parent` without
    /// touching the tree
    pub fn check_insert(&self, parent: NodeId, fragment: &Fragment) -> Result<()> {
        self.node(parent)?;
        let chain = self.kind_chain(parent);
        self.schema.check_fragment(&chain, fragment)?;
        self.check_fresh_ids(fragment)
    }

    fn check_fresh_ids(&self, fragment: &Fragment) -> Result<()> {
        let mut seen = HashSet::new();
        let mut stack = vec![fragment];
        while let Some(f) = stack.pop() {
            if self.nodes.contains_key(&f.id) || !seen.insert(f.id) {
                return Err(DocModelError::TreeStructureError(format!(
                    "node {} is already part of the tree",
                    f.id
                )));
            }
            stack.extend(f.children.iter());
        }
        Ok(())
    }

    fn attach(&mut self, fragment: Fragment, parent: NodeId) -> NodeId {
        let Fragment {
            id,
            kind,
            name,
            attributes,
            text,
            children,
        } = fragment;

        let mut node = Node::new(id, kind, name, attributes, text);
        node.set_parent(Some(parent));
        self.nodes.insert(id, node);

        for child in children {
            let child_id = self.attach(child, id);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.children_mut().push(child_id);
            }
        }
        id
    }

    /// Detach a node and its subtree from the tree
    pub fn remove(&mut self, id: NodeId) -> Result<Removed> {
        if id == self.root {
            return Err(DocModelError::InvalidOperation(
                "the document root cannot be removed".to_string(),
            ));
        }
        let parent = self.node(id)?.parent().ok_or_else(|| {
            DocModelError::TreeStructureError(format!("node {} has no parent", id))
        })?;
        let index = self.index_in_parent(id).ok_or_else(|| {
            DocModelError::TreeStructureError(format!("node {} missing from its parent", id))
        })?;

        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children_mut().remove(index);
        }
        let fragment = self.detach(id)?;

        Ok(Removed {
            parent,
            index,
            fragment,
        })
    }

    fn detach(&mut self, id: NodeId) -> Result<Fragment> {
        let node = self.nodes.remove(&id).ok_or(DocModelError::NodeNotFound(id))?;
        let mut children = Vec::with_capacity(node.children().len());
        for &child in node.children() {
            children.push(self.detach(child)?);
        }
        Ok(Fragment {
            id,
            kind: node.kind(),
            name: node.name().to_string(),
            attributes: node.attributes().clone(),
            text: node.text().to_string(),
            children,
        })
    }

    /// Set (`Some`) or clear (`None`) an attribute, returning the old value
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        key: &str,
        value: Option<String>,
    ) -> Result<Option<String>> {
        let kind = self.node(id)?.kind();
        if value.is_some() {
            self.schema.check_attribute(kind, key)?;
        }
        let node = self.nodes.get_mut(&id).ok_or(DocModelError::NodeNotFound(id))?;
        Ok(match value {
            Some(v) => node.attributes_mut().insert(key.to_string(), v),
            None => node.attributes_mut().remove(key),
        })
    }

    /// Insert characters into a Text node at a character offset
    pub fn insert_text(&mut self, id: NodeId, offset: usize, text: &str) -> Result<()> {
        let node = self.text_node_mut(id)?;
        let byte = char_to_byte(node.text(), offset).ok_or(DocModelError::InvalidPosition {
            node_id: id,
            offset,
        })?;
        node.text_mut().insert_str(byte, text);
        Ok(())
    }

    /// Remove `len` characters from a Text node, returning them
    pub fn remove_text(&mut self, id: NodeId, offset: usize, len: usize) -> Result<String> {
        let node = self.text_node_mut(id)?;
        let invalid = DocModelError::InvalidPosition {
            node_id: id,
            offset: offset + len,
        };
        let start = char_to_byte(node.text(), offset).ok_or_else(|| invalid.clone())?;
        let end = char_to_byte(node.text(), offset + len).ok_or(invalid)?;
        Ok(node.text_mut().drain(start..end).collect())
    }

    fn text_node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let node = self.nodes.get_mut(&id).ok_or(DocModelError::NodeNotFound(id))?;
        if !node.is_text() {
            return Err(DocModelError::InvalidOperation(format!(
                "node {} is not a text node",
                id
            )));
        }
        Ok(node)
    }

    // -------------------------------------------------------------------------
    // Offsets and positions
    // -------------------------------------------------------------------------

    pub fn offset_size(&self, id: NodeId) -> usize {
        self.get(id).map(Node::offset_size).unwrap_or(0)
    }

    /// Offset length of a container: its leading marker plus all children
    pub fn content_length(&self, container: NodeId) -> usize {
        let leading = self.kind(container).map(|k| k.leading_offset()).unwrap_or(0);
        leading
            + self
                .children(container)
                .iter()
                .map(|&c| self.offset_size(c))
                .sum::<usize>()
    }

    /// Offset at which child `index` of `container` starts
    pub fn child_offset(&self, container: NodeId, index: usize) -> usize {
        let leading = self.kind(container).map(|k| k.leading_offset()).unwrap_or(0);
        leading
            + self
                .children(container)
                .iter()
                .take(index)
                .map(|&c| self.offset_size(c))
                .sum::<usize>()
    }

    /// Position right before `id` inside its parent
    pub fn position_before(&self, id: NodeId) -> Option<Position> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        Some(Position::new(parent, self.child_offset(parent, index)))
    }

    /// Position right after `id` inside its parent
    pub fn position_after(&self, id: NodeId) -> Option<Position> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        Some(Position::new(parent, self.child_offset(parent, index + 1)))
    }

    /// Resolve a container position to a child boundary or a text interior
    pub fn locate(&self, position: Position) -> Result<Location> {
        let container = self.node(position.node_id)?;
        let invalid = || DocModelError::InvalidPosition {
            node_id: position.node_id,
            offset: position.offset,
        };
        if container.is_text() || position.offset > self.content_length(position.node_id) {
            return Err(invalid());
        }

        let mut remaining = position
            .offset
            .saturating_sub(container.kind().leading_offset());
        for (index, &child) in container.children().iter().enumerate() {
            if remaining == 0 {
                return Ok(Location::Between { index });
            }
            let child_node = self.node(child)?;
            let size = child_node.offset_size();
            if child_node.is_text() && remaining < size {
                return Ok(Location::InText {
                    index,
                    node: child,
                    offset: remaining,
                });
            }
            remaining -= size;
        }
        Ok(Location::Between {
            index: container.children().len(),
        })
    }

    /// Character data between two offsets of a container. `None` when the
    /// range is out of bounds or covers an element child.
    pub fn text_between(&self, container: NodeId, start: usize, end: usize) -> Option<String> {
        let node = self.get(container)?;
        if start > end || end > self.content_length(container) {
            return None;
        }
        let mut out = String::new();
        let mut offset = node.kind().leading_offset();
        if start < offset {
            return None;
        }
        for &child in node.children() {
            let child_node = self.get(child)?;
            let size = child_node.offset_size();
            let (lo, hi) = (start.max(offset), end.min(offset + size));
            if lo < hi {
                if !child_node.is_text() {
                    return None;
                }
                out.extend(child_node.text().chars().skip(lo - offset).take(hi - lo));
            }
            offset += size;
        }
        Some(out)
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    /// Owned copy of the subtree rooted at `id`
    pub fn to_fragment(&self, id: NodeId) -> Option<Fragment> {
        let node = self.get(id)?;
        Some(Fragment {
            id,
            kind: node.kind(),
            name: node.name().to_string(),
            attributes: node.attributes().clone(),
            text: node.text().to_string(),
            children: node
                .children()
                .iter()
                .filter_map(|&c| self.to_fragment(c))
                .collect(),
        })
    }

    /// Owned copies of the root's children
    pub fn content_fragments(&self) -> Vec<Fragment> {
        self.children(self.root)
            .iter()
            .filter_map(|&c| self.to_fragment(c))
            .collect()
    }

    /// Structural equality of document content, ignoring node ids
    pub fn same_structure(&self, other: &DocumentTree) -> bool {
        crate::same_structure_all(&self.content_fragments(), &other.content_fragments())
    }

    /// Concatenated character data below `id`
    pub fn text_content(&self, id: NodeId) -> String {
        self.to_fragment(id)
            .map(|f| f.text_content())
            .unwrap_or_default()
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy for DocumentTree {
    type Key = NodeId;
    type Item = Node;

    fn item(&self, key: NodeId) -> Option<&Node> {
        self.get(key)
    }

    fn child_keys(&self, key: NodeId) -> &[NodeId] {
        self.children(key)
    }
}

/// Byte index of a character offset, `None` past the end
fn char_to_byte(s: &str, offset: usize) -> Option<usize> {
    if offset == s.chars().count() {
        return Some(s.len());
    }
    s.char_indices().nth(offset).map(|(byte, _)| byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph_tree() -> (DocumentTree, NodeId) {
        let mut tree = DocumentTree::new();
        let p = Fragment::element("p")
            .with_child(Fragment::text("Hello"))
            .with_child(Fragment::reference(1))
            .with_child(Fragment::text("World"));
        let root = tree.root_id();
        let p_id = tree.insert(root, 0, p).unwrap();
        (tree, p_id)
    }

    #[test]
    fn test_insert_and_remove_roundtrip() {
        let (mut tree, p_id) = paragraph_tree();
        assert_eq!(tree.len(), 5);

        let before = tree.to_fragment(p_id).unwrap();
        let removed = tree.remove(p_id).unwrap();
        assert_eq!(removed.index, 0);
        assert_eq!(removed.parent, tree.root_id());
        assert_eq!(tree.len(), 1);
        assert_eq!(removed.fragment, before);

        let root = tree.root_id();
        let id = tree.insert(root, 0, removed.fragment).unwrap();
        assert_eq!(id, p_id);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_schema_violation_leaves_tree_untouched() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let bad = Fragment::element("p").with_child(Fragment::list());
        let err = tree.insert(root, 0, bad).unwrap_err();

        assert!(matches!(err, DocModelError::SchemaViolation { .. }));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let (mut tree, p_id) = paragraph_tree();
        let copy = tree.to_fragment(p_id).unwrap();
        let root = tree.root_id();
        assert!(matches!(
            tree.insert(root, 1, copy),
            Err(DocModelError::TreeStructureError(_))
        ));
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        assert!(tree.remove(root).is_err());
    }

    #[test]
    fn test_text_editing() {
        let (mut tree, p_id) = paragraph_tree();
        let text = tree.children(p_id)[0];

        tree.insert_text(text, 5, ", there").unwrap();
        assert_eq!(tree.get(text).unwrap().text(), "Hello, there");

        let cut = tree.remove_text(text, 0, 7).unwrap();
        assert_eq!(cut, "Hello, ");
        assert_eq!(tree.get(text).unwrap().text(), "there");

        assert!(tree.insert_text(text, 99, "x").is_err());
        assert!(tree.insert_text(p_id, 0, "x").is_err());
    }

    #[test]
    fn test_locate_positions() {
        let (tree, p_id) = paragraph_tree();
        let children = tree.children(p_id).to_vec();

        assert_eq!(tree.content_length(p_id), 11);
        assert_eq!(
            tree.locate(Position::new(p_id, 0)).unwrap(),
            Location::Between { index: 0 }
        );
        assert_eq!(
            tree.locate(Position::new(p_id, 2)).unwrap(),
            Location::InText {
                index: 0,
                node: children[0],
                offset: 2
            }
        );
        assert_eq!(
            tree.locate(Position::new(p_id, 5)).unwrap(),
            Location::Between { index: 1 }
        );
        assert_eq!(
            tree.locate(Position::new(p_id, 6)).unwrap(),
            Location::Between { index: 2 }
        );
        assert_eq!(
            tree.locate(Position::new(p_id, 11)).unwrap(),
            Location::Between { index: 3 }
        );
        assert!(tree.locate(Position::new(p_id, 12)).is_err());
    }

    #[test]
    fn test_text_between() {
        let (tree, p_id) = paragraph_tree();
        assert_eq!(tree.text_between(p_id, 1, 4).as_deref(), Some("ell"));
        assert_eq!(tree.text_between(p_id, 7, 11).as_deref(), Some("orld"));
        assert_eq!(tree.text_between(p_id, 4, 7), None);
        assert_eq!(tree.text_between(p_id, 9, 12), None);
    }

    #[test]
    fn test_item_offsets_include_marker() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let section = Fragment::section().with_child(
            Fragment::list().with_child(Fragment::item(1).with_child(Fragment::text("Hi"))),
        );
        tree.insert(root, 0, section).unwrap();
        let item = crate::footnote_items(&tree)[0];

        assert_eq!(tree.content_length(item), 3);
        assert_eq!(
            tree.locate(Position::new(item, 1)).unwrap(),
            Location::Between { index: 0 }
        );
        let section = tree.children(root)[0];
        assert_eq!(tree.position_after(section), Some(Position::new(root, 1)));
        assert_eq!(tree.position_before(section), Some(Position::new(root, 0)));
    }

    #[test]
    fn test_set_attribute_checks_schema() {
        let (mut tree, p_id) = paragraph_tree();
        let reference = tree.children(p_id)[1];

        let old = tree
            .set_attribute(reference, crate::FOOTNOTE_ID_ATTR, Some("2".to_string()))
            .unwrap();
        assert_eq!(old.as_deref(), Some("1"));
        assert_eq!(tree.get(reference).unwrap().footnote_id(), Some(2));

        assert!(tree
            .set_attribute(reference, "href", Some("#x".to_string()))
            .is_err());
    }
}
