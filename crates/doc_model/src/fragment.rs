//! Detached, owned subtrees
//!
//! A [`Fragment`] is the unit that enters and leaves the tree: inserts take
//! one, removals hand one back, and the upcast produces them. Node ids are
//! carried along so that a removed subtree can be restored with its identity.

use crate::{NodeId, NodeKind, FOOTNOTE_ID_ATTR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<Fragment>,
}

impl Fragment {
    /// Create an empty node of the given kind with its default name
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            name: kind.default_name().to_string(),
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Create a generic flow element (`Other`) with the given element name
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new(NodeKind::Other)
        }
    }

    pub fn text(data: impl Into<String>) -> Self {
        Self {
            text: data.into(),
            ..Self::new(NodeKind::Text)
        }
    }

    pub fn section() -> Self {
        Self::new(NodeKind::Section)
    }

    pub fn list() -> Self {
        Self::new(NodeKind::List)
    }

    /// A footnote body with the given id and no content
    pub fn item(footnote_id: u32) -> Self {
        Self::new(NodeKind::Item).with_attr(FOOTNOTE_ID_ATTR, footnote_id.to_string())
    }

    pub fn reference(footnote_id: u32) -> Self {
        Self::new(NodeKind::Reference).with_attr(FOOTNOTE_ID_ATTR, footnote_id.to_string())
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Fragment>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn footnote_id(&self) -> Option<u32> {
        self.attributes
            .get(FOOTNOTE_ID_ATTR)
            .and_then(|v| crate::parse_footnote_id(v))
    }

    /// Concatenated character data of this subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if self.kind == NodeKind::Text {
            out.push_str(&self.text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Structural equality on kind, name, attributes, text and children.
    /// Node ids are ignored.
    pub fn same_structure(&self, other: &Fragment) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.attributes == other.attributes
            && self.text == other.text
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_structure(b))
    }

    /// Drop empty text nodes and merge adjacent text siblings, recursively
    pub fn normalize(&mut self) {
        let mut merged: Vec<Fragment> = Vec::with_capacity(self.children.len());
        for mut child in self.children.drain(..) {
            if child.kind == NodeKind::Text {
                if child.text.is_empty() {
                    continue;
                }
                if let Some(last) = merged.last_mut() {
                    if last.kind == NodeKind::Text {
                        last.text.push_str(&child.text);
                        continue;
                    }
                }
            } else {
                child.normalize();
            }
            merged.push(child);
        }
        self.children = merged;
    }

    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Fragment::node_count).sum::<usize>()
    }
}

/// Compare two fragment sequences structurally
pub fn same_structure_all(a: &[Fragment], b: &[Fragment]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_structure(y))
}
