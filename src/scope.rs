use crate::dom::NodeRef;

/// Scoping predicate for a controller's effective root.
///
/// A node belongs to the root iff no element with the host's tag name,
/// found inside the root, is the node itself or one of its ancestors.
/// Nesting is recursive: a nested same-tag element and everything below it
/// belong to that nested instance.
///
/// Nested hosts are collected by querying the root's subtree when the scope
/// is built. Build a fresh scope per change batch or per read; a removed
/// nested host simply stops being found, which re-admits its former
/// descendants.
#[derive(Debug, Clone)]
pub struct TreeScope {
    root: NodeRef,
    tag_name: String,
    nested: Vec<NodeRef>,
}

impl TreeScope {
    pub fn new(root: &NodeRef, tag_name: &str) -> Self {
        let nested = root
            .descendants()
            .into_iter()
            .filter(|node| node.has_tag(tag_name))
            .collect();

        Self {
            root: root.clone(),
            tag_name: tag_name.to_ascii_lowercase(),
            nested,
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Same-tag elements found below the root, in document order.
    pub fn nested_hosts(&self) -> &[NodeRef] {
        &self.nested
    }

    pub fn belongs_to(&self, node: &NodeRef) -> bool {
        !self
            .nested
            .iter()
            .any(|nested| nested.contains(node))
    }
}

/// One-shot form of [`TreeScope::belongs_to`].
pub fn belongs_to(root: &NodeRef, node: &NodeRef, tag_name: &str) -> bool {
    TreeScope::new(root, tag_name).belongs_to(node)
}
