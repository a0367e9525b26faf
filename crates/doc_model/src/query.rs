//! Generic descendant queries
//!
//! Any tree that can hand out a node by key and list a node's child keys
//! gets preorder search for free. Both the document tree and the view tree
//! implement [`Hierarchy`].

/// Read access to a keyed tree
pub trait Hierarchy {
    type Key: Copy + PartialEq;
    type Item;

    fn item(&self, key: Self::Key) -> Option<&Self::Item>;

    fn child_keys(&self, key: Self::Key) -> &[Self::Key];
}

/// All descendants of `root` in document order (preorder), `root` excluded
pub fn descendants<H: Hierarchy>(tree: &H, root: H::Key) -> Vec<H::Key> {
    let mut out = Vec::new();
    let mut stack: Vec<H::Key> = tree.child_keys(root).iter().rev().copied().collect();
    while let Some(key) = stack.pop() {
        out.push(key);
        stack.extend(tree.child_keys(key).iter().rev().copied());
    }
    out
}

/// First descendant of `root` in document order matching `predicate`
pub fn query_first<H, P>(tree: &H, root: H::Key, mut predicate: P) -> Option<H::Key>
where
    H: Hierarchy,
    P: FnMut(&H::Item) -> bool,
{
    let mut stack: Vec<H::Key> = tree.child_keys(root).iter().rev().copied().collect();
    while let Some(key) = stack.pop() {
        if tree.item(key).is_some_and(&mut predicate) {
            return Some(key);
        }
        stack.extend(tree.child_keys(key).iter().rev().copied());
    }
    None
}

/// Every descendant of `root` matching `predicate`, in document order
pub fn query_all<H, P>(tree: &H, root: H::Key, mut predicate: P) -> Vec<H::Key>
where
    H: Hierarchy,
    P: FnMut(&H::Item) -> bool,
{
    descendants(tree, root)
        .into_iter()
        .filter(|&key| tree.item(key).is_some_and(&mut predicate))
        .collect()
}
