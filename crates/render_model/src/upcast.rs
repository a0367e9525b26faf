//! View to model conversion
//!
//! Elements are matched in priority order: footnote section, footnote list,
//! footnote item, reference, then any other element. A matched element
//! becomes a model node only if the schema accepts it at that position;
//! otherwise it is skipped together with its subtree and the rest of the
//! document still converts.

use crate::rules::{
    item_prefix, DATA_FOOTNOTE_ID, ITEM_CLASS, LIST_CLASS, REFERENCE_CLASS, SECTION_CLASS,
};
use crate::{Result, ViewContent, ViewId, ViewNode, ViewTree};
use doc_model::{DocumentTree, Fragment, NodeId, NodeKind, Schema, FOOTNOTE_ID_ATTR};
use tracing::{debug, warn};

/// An element left out of the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedElement {
    pub view: ViewId,
    pub name: String,
    pub reason: String,
}

/// Result of an upcast
#[derive(Debug, Clone)]
pub struct UpcastOutput {
    pub tree: DocumentTree,
    pub skipped: Vec<SkippedElement>,
}

/// Convert a view tree into a fresh document governed by `schema`
pub fn upcast(view: &ViewTree, schema: Schema) -> Result<UpcastOutput> {
    let mut upcaster = Upcaster {
        view,
        tree: DocumentTree::with_schema(schema),
        skipped: Vec::new(),
    };
    let root = upcaster.tree.root_id();
    upcaster.convert_children(view.root(), root, None)?;
    Ok(UpcastOutput {
        tree: upcaster.tree,
        skipped: upcaster.skipped,
    })
}

/// Match one view element to the model node it stands for
fn match_element(node: &ViewNode) -> std::result::Result<Fragment, String> {
    let name = node.name().unwrap_or_default();
    let footnote_id = || {
        node.attribute(DATA_FOOTNOTE_ID)
            .map(str::to_string)
            .ok_or_else(|| format!("{} without {}", name, DATA_FOOTNOTE_ID))
    };

    if name == "section" && node.has_class(SECTION_CLASS) {
        return Ok(Fragment::section());
    }
    if name == "section" && node.has_class(LIST_CLASS) {
        return Ok(Fragment::list());
    }
    if name == "span" && node.has_class(ITEM_CLASS) {
        return Ok(Fragment::new(NodeKind::Item).with_attr(FOOTNOTE_ID_ATTR, footnote_id()?));
    }
    if name == "span" && node.has_class(REFERENCE_CLASS) {
        return Ok(Fragment::new(NodeKind::Reference).with_attr(FOOTNOTE_ID_ATTR, footnote_id()?));
    }

    // Widget decorations only ever sit on the footnote elements above, so
    // other elements keep every attribute
    let mut fragment = Fragment::element(name);
    if let Some(attributes) = node.attributes() {
        fragment.attributes = attributes.clone();
    }
    Ok(fragment)
}

struct Upcaster<'a> {
    view: &'a ViewTree,
    tree: DocumentTree,
    skipped: Vec<SkippedElement>,
}

impl Upcaster<'_> {
    fn convert_children(
        &mut self,
        element: ViewId,
        parent: NodeId,
        prefix: Option<String>,
    ) -> Result<()> {
        let view = self.view;
        for (index, &child) in view.children(element).iter().enumerate() {
            let node = view.node(child)?;
            match node.content() {
                ViewContent::Text(data) => {
                    let data = match (&prefix, index) {
                        (Some(prefix), 0) => data.strip_prefix(prefix.as_str()).unwrap_or(data),
                        _ => data.as_str(),
                    };
                    self.append_text(parent, data, child)?;
                }
                ViewContent::Element { name, .. } => {
                    let fragment = match match_element(node) {
                        Ok(fragment) => fragment,
                        Err(reason) => {
                            self.skip(child, name, reason);
                            continue;
                        }
                    };
                    if let Err(e) = self.tree.check_insert(parent, &fragment) {
                        self.skip(child, name, e.to_string());
                        continue;
                    }

                    let kind = fragment.kind;
                    let prefix = match kind {
                        NodeKind::Item => fragment
                            .attributes
                            .get(FOOTNOTE_ID_ATTR)
                            .map(|id| item_prefix(id)),
                        _ => None,
                    };
                    let at = self.tree.children(parent).len();
                    let id = self.tree.insert(parent, at, fragment)?;
                    // The rendered label of a Reference is not content
                    if kind != NodeKind::Reference {
                        self.convert_children(child, id, prefix)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn append_text(&mut self, parent: NodeId, data: &str, source: ViewId) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if let Some(&last) = self.tree.children(parent).last() {
            let last_node = self.tree.node(last)?;
            if last_node.is_text() {
                let offset = last_node.text().chars().count();
                self.tree.insert_text(last, offset, data)?;
                return Ok(());
            }
        }

        let fragment = Fragment::text(data);
        match self.tree.check_insert(parent, &fragment) {
            Ok(()) => {
                let at = self.tree.children(parent).len();
                self.tree.insert(parent, at, fragment)?;
            }
            Err(_) if data.trim().is_empty() => {
                debug!(view = %source, "dropped whitespace between blocks");
            }
            Err(e) => self.skip(source, "#text", e.to_string()),
        }
        Ok(())
    }

    fn skip(&mut self, view: ViewId, name: &str, reason: String) {
        warn!(view = %view, element = name, %reason, "skipped element during upcast");
        self.skipped.push(SkippedElement {
            view,
            name: name.to_string(),
            reason,
        });
    }
}
