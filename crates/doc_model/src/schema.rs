//! Structural rules for the document tree
//!
//! Every node kind declares where it may appear, which attributes it may
//! carry and whether it is laid out as a block or inline. `DocumentTree`
//! consults the schema before applying any insert or attribute change.

use crate::{DocModelError, Fragment, NodeKind, Result, FOOTNOTE_ID_ATTR};
use std::collections::HashMap;

/// Layout classification of a node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Block,
    Inline,
}

/// Attributes a kind accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedAttributes {
    Any,
    Only(Vec<String>),
}

impl AllowedAttributes {
    fn only(keys: &[&str]) -> Self {
        AllowedAttributes::Only(keys.iter().map(|k| k.to_string()).collect())
    }

    pub fn allows(&self, key: &str) -> bool {
        match self {
            AllowedAttributes::Any => true,
            AllowedAttributes::Only(keys) => keys.iter().any(|k| k == key),
        }
    }
}

/// Registration for one node kind
#[derive(Debug, Clone)]
pub struct KindRule {
    /// Parent kinds this kind may be inserted into
    pub allowed_parents: Vec<NodeKind>,
    pub attributes: AllowedAttributes,
    pub placement: Placement,
    /// Objects are selected and deleted as a whole
    pub is_object: bool,
}

impl KindRule {
    pub fn new(allowed_parents: &[NodeKind], placement: Placement) -> Self {
        Self {
            allowed_parents: allowed_parents.to_vec(),
            attributes: AllowedAttributes::Only(Vec::new()),
            placement,
            is_object: false,
        }
    }

    pub fn with_attributes(mut self, attributes: AllowedAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn object(mut self) -> Self {
        self.is_object = true;
        self
    }
}

/// The schema registry
#[derive(Debug, Clone)]
pub struct Schema {
    rules: HashMap<NodeKind, KindRule>,
}

impl Schema {
    /// A schema with no registered kinds (every insert is rejected)
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Register or replace the rule for a kind
    pub fn register(&mut self, kind: NodeKind, rule: KindRule) -> &mut Self {
        self.rules.insert(kind, rule);
        self
    }

    pub fn rule(&self, kind: NodeKind) -> Option<&KindRule> {
        self.rules.get(&kind)
    }

    pub fn placement(&self, kind: NodeKind) -> Option<Placement> {
        self.rule(kind).map(|r| r.placement)
    }

    pub fn is_inline(&self, kind: NodeKind) -> bool {
        self.placement(kind) == Some(Placement::Inline)
    }

    /// Check the parent rule alone, without ancestor context
    pub fn allows_child(&self, parent: NodeKind, child: NodeKind) -> bool {
        self.rule(child)
            .map(|r| r.allowed_parents.contains(&parent))
            .unwrap_or(false)
    }

    /// Check that `child` may be placed under a parent whose kind chain
    /// (parent first, root last) is `ancestors`.
    pub fn check_child(&self, ancestors: &[NodeKind], child: NodeKind) -> Result<()> {
        let parent = ancestors.first().copied().ok_or_else(|| {
            DocModelError::TreeStructureError("insert target has no kind".to_string())
        })?;

        if self.rule(child).is_none() {
            return Err(violation(parent, child, "kind is not registered"));
        }
        if !self.allows_child(parent, child) {
            return Err(violation(parent, child, "parent kind not allowed"));
        }
        if child == NodeKind::Section
            && ancestors
                .iter()
                .any(|k| matches!(k, NodeKind::List | NodeKind::Section))
        {
            return Err(violation(
                parent,
                child,
                "a footnote section cannot be nested inside footnote content",
            ));
        }
        Ok(())
    }

    pub fn check_attribute(&self, kind: NodeKind, key: &str) -> Result<()> {
        let allowed = self
            .rule(kind)
            .map(|r| r.attributes.allows(key))
            .unwrap_or(false);
        if allowed {
            Ok(())
        } else {
            Err(DocModelError::DisallowedAttribute {
                kind,
                key: key.to_string(),
            })
        }
    }

    /// Validate a whole subtree before it is attached
    pub fn check_fragment(&self, ancestors: &[NodeKind], fragment: &Fragment) -> Result<()> {
        self.check_child(ancestors, fragment.kind)?;
        for key in fragment.attributes.keys() {
            self.check_attribute(fragment.kind, key)?;
        }

        if fragment.kind == NodeKind::Text {
            if !fragment.children.is_empty() {
                return Err(violation(
                    NodeKind::Text,
                    fragment.children[0].kind,
                    "text nodes cannot have children",
                ));
            }
            return Ok(());
        }

        let mut chain = Vec::with_capacity(ancestors.len() + 1);
        chain.push(fragment.kind);
        chain.extend_from_slice(ancestors);
        for child in &fragment.children {
            self.check_fragment(&chain, child)?;
        }
        Ok(())
    }
}

fn violation(parent: NodeKind, child: NodeKind, reason: &str) -> DocModelError {
    DocModelError::SchemaViolation {
        parent,
        child,
        reason: reason.to_string(),
    }
}

impl Default for Schema {
    fn default() -> Self {
        use NodeKind::*;

        let mut schema = Schema::empty();
        schema
            .register(Root, KindRule::new(&[], Placement::Block))
            .register(Section, KindRule::new(&[Root, Other], Placement::Block).object())
            .register(List, KindRule::new(&[Section], Placement::Block))
            .register(
                Item,
                KindRule::new(&[List], Placement::Block)
                    .with_attributes(AllowedAttributes::only(&[FOOTNOTE_ID_ATTR]))
                    .object(),
            )
            .register(
                Reference,
                KindRule::new(&[Other, Item], Placement::Inline)
                    .with_attributes(AllowedAttributes::only(&[FOOTNOTE_ID_ATTR]))
                    .object(),
            )
            .register(Text, KindRule::new(&[Other, Item], Placement::Inline))
            .register(
                Other,
                KindRule::new(&[Root, Other, Item], Placement::Block)
                    .with_attributes(AllowedAttributes::Any),
            );
        schema
    }
}
