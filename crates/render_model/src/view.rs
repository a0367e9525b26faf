//! View trees
//!
//! A [`ViewTree`] is the external shape of a document: plain elements with
//! ordered attributes, and text. Both the persisted markup and the live
//! editing surface are view trees. Nodes live in an arena and are addressed
//! by [`ViewId`]. Slots of removed nodes are reused; every reuse bumps the
//! slot's generation, so a stale id never aliases a newer node.

use crate::{RenderError, Result};
use doc_model::{Hierarchy, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Arena slot and generation of a view node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId {
    index: usize,
    generation: u32,
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.generation == 0 {
            write!(f, "v{}", self.index)
        } else {
            write!(f, "v{}.{}", self.index, self.generation)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewContent {
    Element {
        name: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewNode {
    content: ViewContent,
    parent: Option<ViewId>,
    children: Vec<ViewId>,
    /// Model node this view node was produced from
    model: Option<NodeId>,
}

impl ViewNode {
    pub fn content(&self) -> &ViewContent {
        &self.content
    }

    /// Element name, `None` for text
    pub fn name(&self) -> Option<&str> {
        match &self.content {
            ViewContent::Element { name, .. } => Some(name),
            ViewContent::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            ViewContent::Text(data) => Some(data),
            ViewContent::Element { .. } => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.content, ViewContent::Text(_))
    }

    pub fn attributes(&self) -> Option<&BTreeMap<String, String>> {
        match &self.content {
            ViewContent::Element { attributes, .. } => Some(attributes),
            ViewContent::Text(_) => None,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes()?.get(key).map(String::as_str)
    }

    /// Whether the whitespace separated `class` attribute lists `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn is_element(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    pub fn children(&self) -> &[ViewId] {
        &self.children
    }

    pub fn model(&self) -> Option<NodeId> {
        self.model
    }

    /// Number of offsets this node occupies inside its parent
    pub fn offset_size(&self) -> usize {
        match &self.content {
            ViewContent::Text(data) => data.chars().count(),
            ViewContent::Element { .. } => 1,
        }
    }
}

/// Arena backed view tree with a synthetic `$root` element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewTree {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: ViewId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    node: Option<ViewNode>,
}

impl ViewTree {
    pub fn new() -> Self {
        let root = ViewNode {
            content: ViewContent::Element {
                name: "$root".to_string(),
                attributes: BTreeMap::new(),
            },
            parent: None,
            children: Vec::new(),
            model: None,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root),
            }],
            free: Vec::new(),
            root: ViewId {
                index: 0,
                generation: 0,
            },
        }
    }

    pub fn root(&self) -> ViewId {
        self.root
    }

    pub fn get(&self, id: ViewId) -> Option<&ViewNode> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn node(&self, id: ViewId) -> Result<&ViewNode> {
        self.get(id).ok_or(RenderError::ViewNodeNotFound(id))
    }

    fn node_mut(&mut self, id: ViewId) -> Result<&mut ViewNode> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(RenderError::ViewNodeNotFound(id))
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.get(id).map(ViewNode::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.get(id).and_then(ViewNode::parent)
    }

    pub fn index_in_parent(&self, id: ViewId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    fn alloc(&mut self, content: ViewContent) -> ViewId {
        let node = ViewNode {
            content,
            parent: None,
            children: Vec::new(),
            model: None,
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation += 1;
                slot.node = Some(node);
                ViewId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                ViewId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Create a detached element
    pub fn create_element(
        &mut self,
        name: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> ViewId {
        self.alloc(ViewContent::Element {
            name: name.into(),
            attributes,
        })
    }

    /// Create a detached text node
    pub fn create_text(&mut self, data: impl Into<String>) -> ViewId {
        self.alloc(ViewContent::Text(data.into()))
    }

    /// Attach a detached node as child `index` of `parent`
    pub fn insert_child(&mut self, parent: ViewId, index: usize, child: ViewId) -> Result<()> {
        if self.node(child)?.parent.is_some() || child == self.root {
            return Err(RenderError::ViewStructure(format!(
                "{} is already attached",
                child
            )));
        }
        let parent_node = self.node_mut(parent)?;
        if parent_node.is_text() {
            return Err(RenderError::ViewStructure(format!(
                "text node {} cannot have children",
                parent
            )));
        }
        if index > parent_node.children.len() {
            return Err(RenderError::ViewStructure(format!(
                "index {} out of bounds for {}",
                index, parent
            )));
        }
        parent_node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: ViewId, child: ViewId) -> Result<()> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Create an element and append it to `parent`
    pub fn append_element(
        &mut self,
        parent: ViewId,
        name: &str,
        attributes: &[(&str, &str)],
    ) -> Result<ViewId> {
        let attributes = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let id = self.create_element(name, attributes);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Create a text node and append it to `parent`
    pub fn append_text(&mut self, parent: ViewId, data: &str) -> Result<ViewId> {
        let id = self.create_text(data);
        self.append_child(parent, id)?;
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Detach `id` and drop its subtree. Returns the dropped ids, `id` first.
    pub fn remove(&mut self, id: ViewId) -> Result<Vec<ViewId>> {
        if id == self.root {
            return Err(RenderError::ViewStructure(
                "the view root cannot be removed".to_string(),
            ));
        }
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|&c| c != id);
        }

        let mut dropped = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let slot = self
                .slots
                .get_mut(next.index)
                .filter(|slot| slot.generation == next.generation);
            if let Some(node) = slot.and_then(|slot| slot.node.take()) {
                self.free.push(next.index);
                dropped.push(next);
                stack.extend(node.children.iter().rev());
            }
        }
        Ok(dropped)
    }

    /// Set (`Some`) or clear (`None`) an element attribute
    pub fn set_attribute(&mut self, id: ViewId, key: &str, value: Option<&str>) -> Result<()> {
        match &mut self.node_mut(id)?.content {
            ViewContent::Element { attributes, .. } => {
                match value {
                    Some(v) => attributes.insert(key.to_string(), v.to_string()),
                    None => attributes.remove(key),
                };
                Ok(())
            }
            ViewContent::Text(_) => Err(RenderError::ViewStructure(format!(
                "text node {} has no attributes",
                id
            ))),
        }
    }

    /// Replace the data of a text node
    pub fn set_text(&mut self, id: ViewId, data: &str) -> Result<()> {
        match &mut self.node_mut(id)?.content {
            ViewContent::Text(current) => {
                data.clone_into(current);
                Ok(())
            }
            ViewContent::Element { .. } => Err(RenderError::ViewStructure(format!(
                "element {} has no character data",
                id
            ))),
        }
    }

    /// Record the model node `id` was produced from
    pub fn bind(&mut self, id: ViewId, model: NodeId) -> Result<()> {
        self.node_mut(id)?.model = Some(model);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reading
    // -------------------------------------------------------------------------

    /// Concatenated character data below `id`
    pub fn text_content(&self, id: ViewId) -> String {
        let mut out = String::new();
        if let Some(data) = self.get(id).and_then(ViewNode::text) {
            out.push_str(data);
        }
        for key in doc_model::descendants(self, id) {
            if let Some(data) = self.get(key).and_then(ViewNode::text) {
                out.push_str(data);
            }
        }
        out
    }

    /// Offset length of a view element's content
    pub fn content_length(&self, id: ViewId) -> usize {
        self.children(id)
            .iter()
            .filter_map(|&c| self.get(c))
            .map(ViewNode::offset_size)
            .sum()
    }

    /// Find the child an offset of `container` falls on: the child index and
    /// the offset inside it (always 0 for elements and boundaries)
    pub fn locate(&self, container: ViewId, offset: usize) -> Option<(usize, usize)> {
        let mut remaining = offset;
        for (index, &child) in self.children(container).iter().enumerate() {
            let size = self.get(child)?.offset_size();
            if remaining == 0 || remaining < size {
                return Some((index, remaining));
            }
            remaining -= size;
        }
        (remaining == 0).then_some((self.children(container).len(), 0))
    }

    /// Structural equality of the two trees below their roots. Arena ids and
    /// model bindings are ignored.
    pub fn same_structure(&self, other: &ViewTree) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }

    fn subtree_eq(&self, a: ViewId, other: &ViewTree, b: ViewId) -> bool {
        let (Some(left), Some(right)) = (self.get(a), other.get(b)) else {
            return false;
        };
        left.content == right.content
            && left.children.len() == right.children.len()
            && left
                .children
                .iter()
                .zip(&right.children)
                .all(|(&x, &y)| self.subtree_eq(x, other, y))
    }
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy for ViewTree {
    type Key = ViewId;
    type Item = ViewNode;

    fn item(&self, key: ViewId) -> Option<&ViewNode> {
        self.get(key)
    }

    fn child_keys(&self, key: ViewId) -> &[ViewId] {
        self.children(key)
    }
}
