//! Model to view conversion rules
//!
//! One builder per node kind, selected by a single `match`. The persisted
//! (data) and live (editing) forms share the Item and Reference builders;
//! the live form only adds widget decorations on top.

use crate::{Result, ViewId, ViewTree};
use doc_model::{footnote_items, DocumentTree, Node, NodeId, NodeKind};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

pub const DATA_FOOTNOTE_ID: &str = "data-footnote-id";
pub const WIDGET_CLASS: &str = "ck-widget";
pub const CONTENT_EDITABLE: &str = "contenteditable";

pub const SECTION_CLASS: &str = "footnote-section";
pub const LIST_CLASS: &str = "footnote-list";
pub const ITEM_CLASS: &str = "footnote-item";
pub const REFERENCE_CLASS: &str = "noteholder";

/// Which view form to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Persisted markup
    Data,
    /// Live editing surface
    Editing,
}

/// Numbering marker rendered at the start of an Item
pub fn item_prefix(footnote_id: &str) -> String {
    format!("{}. ", footnote_id)
}

/// Text rendered inside a Reference
pub fn reference_label(footnote_id: &str) -> String {
    format!("[{}]", footnote_id)
}

/// Anchor target of an Item
pub fn item_anchor(footnote_id: &str) -> String {
    format!("fn{}", footnote_id)
}

fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn raw_id(node: &Node) -> &str {
    node.attribute(doc_model::FOOTNOTE_ID_ATTR).unwrap_or_default()
}

/// Builds view subtrees for model nodes
pub struct Downcaster<'a> {
    tree: &'a DocumentTree,
    mode: ViewMode,
    known_ids: HashSet<u32>,
}

impl<'a> Downcaster<'a> {
    pub fn new(tree: &'a DocumentTree, mode: ViewMode) -> Self {
        let known_ids = footnote_items(tree)
            .into_iter()
            .filter_map(|item| tree.get(item).and_then(Node::footnote_id))
            .collect();
        Self {
            tree,
            mode,
            known_ids,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Whether a Reference has no Item to point at
    pub fn is_orphan(&self, node: &Node) -> bool {
        node.footnote_id()
            .map_or(true, |id| !self.known_ids.contains(&id))
    }

    /// Build the whole document into a fresh view tree
    pub fn build(&self) -> Result<ViewTree> {
        let mut view = ViewTree::new();
        let root = view.root();
        view.bind(root, self.tree.root_id())?;
        self.build_children(&mut view, root, self.tree.root_id())?;
        Ok(view)
    }

    fn build_children(&self, view: &mut ViewTree, element: ViewId, model: NodeId) -> Result<()> {
        for &child in self.tree.children(model) {
            let index = view.children(element).len();
            self.build_node(&mut *view, element, index, child)?;
        }
        Ok(())
    }

    /// Build the subtree of `id` and attach it as child `index` of `parent`.
    ///
    /// Returns `None` when the node renders as absent (an orphan Reference).
    pub fn build_node(
        &self,
        view: &mut ViewTree,
        parent: ViewId,
        index: usize,
        id: NodeId,
    ) -> Result<Option<ViewId>> {
        let node = self.tree.node(id)?;
        let editing = self.mode == ViewMode::Editing;

        let element = match node.kind() {
            NodeKind::Text => view.create_text(node.text()),
            NodeKind::Section => {
                let mut a = attrs(&[("class", "footnote-section footnotes")]);
                if editing {
                    decorate_widget(&mut a);
                }
                view.create_element("section", a)
            }
            NodeKind::List => {
                let mut a = attrs(&[("class", LIST_CLASS)]);
                if editing {
                    a.insert(CONTENT_EDITABLE.to_string(), "true".to_string());
                }
                view.create_element("section", a)
            }
            NodeKind::Item => self.item_view(view, node)?,
            NodeKind::Reference => {
                if self.is_orphan(node) {
                    warn!(node = %id, footnote_id = raw_id(node), "reference has no matching footnote; not rendered");
                    return Ok(None);
                }
                self.reference_view(view, node)?
            }
            NodeKind::Root | NodeKind::Other => {
                view.create_element(node.name(), node.attributes().clone())
            }
        };

        view.bind(element, id)?;
        view.insert_child(parent, index, element)?;
        if !matches!(node.kind(), NodeKind::Text | NodeKind::Reference) {
            self.build_children(view, element, id)?;
        }
        Ok(Some(element))
    }

    fn item_view(&self, view: &mut ViewTree, node: &Node) -> Result<ViewId> {
        let id = raw_id(node);
        let anchor = item_anchor(id);
        let mut a = attrs(&[("class", ITEM_CLASS), ("id", anchor.as_str()), (DATA_FOOTNOTE_ID, id)]);
        if self.mode == ViewMode::Editing {
            decorate_widget(&mut a);
        }
        let element = view.create_element("span", a);
        view.append_text(element, &item_prefix(id))?;
        Ok(element)
    }

    fn reference_view(&self, view: &mut ViewTree, node: &Node) -> Result<ViewId> {
        let id = raw_id(node);
        let mut a = attrs(&[("class", REFERENCE_CLASS), (DATA_FOOTNOTE_ID, id)]);
        if self.mode == ViewMode::Editing {
            decorate_widget(&mut a);
        }
        let element = view.create_element("span", a);
        let sup = view.append_element(element, "sup", &[])?;
        let href = format!("#{}", item_anchor(id));
        let link = view.append_element(sup, "a", &[("href", href.as_str())])?;
        view.append_text(link, &reference_label(id))?;
        Ok(element)
    }
}

fn decorate_widget(attributes: &mut BTreeMap<String, String>) {
    let class = attributes.entry("class".to_string()).or_default();
    if !class.is_empty() {
        class.push(' ');
    }
    class.push_str(WIDGET_CLASS);
    attributes.insert(CONTENT_EDITABLE.to_string(), "false".to_string());
}

/// Rewrite a rendered Item for a new id: anchor, data attribute and the
/// numbering prefix
pub fn renumber_item_view(view: &mut ViewTree, element: ViewId, footnote_id: &str) -> Result<()> {
    view.set_attribute(element, "id", Some(item_anchor(footnote_id).as_str()))?;
    view.set_attribute(element, DATA_FOOTNOTE_ID, Some(footnote_id))?;
    let prefix = view
        .children(element)
        .first()
        .copied()
        .filter(|&c| view.get(c).is_some_and(|n| n.is_text() && n.model().is_none()));
    match prefix {
        Some(text) => view.set_text(text, &item_prefix(footnote_id)),
        None => {
            let text = view.create_text(item_prefix(footnote_id));
            view.insert_child(element, 0, text)
        }
    }
}

/// Rewrite a rendered Reference for a new id: data attribute, link target
/// and label
pub fn renumber_reference_view(
    view: &mut ViewTree,
    element: ViewId,
    footnote_id: &str,
) -> Result<()> {
    view.set_attribute(element, DATA_FOOTNOTE_ID, Some(footnote_id))?;
    let link = doc_model::query_first(&*view, element, |n| n.is_element("a"));
    if let Some(link) = link {
        let href = format!("#{}", item_anchor(footnote_id));
        view.set_attribute(link, "href", Some(href.as_str()))?;
        let label = doc_model::query_first(&*view, link, |n| n.is_text());
        if let Some(label) = label {
            view.set_text(label, &reference_label(footnote_id))?;
        }
    }
    Ok(())
}

/// Convert a whole document to its view form
pub fn downcast(tree: &DocumentTree, mode: ViewMode) -> Result<ViewTree> {
    Downcaster::new(tree, mode).build()
}
