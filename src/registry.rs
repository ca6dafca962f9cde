use crate::dom::NodeRef;

/// A listener the binder has attached: `event` on `node` runs the host action `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisteredAction {
    pub node: NodeRef,
    pub event: String,
    pub name: String,
}

/// Insertion-ordered set of registered actions. No two entries share
/// `(node, event, name)`.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<RegisteredAction>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: &NodeRef, event: &str, name: &str) -> bool {
        self.actions
            .iter()
            .any(|action| action.node == *node && action.event == event && action.name == name)
    }

    /// Returns false (and stores nothing) if the triple is already present.
    pub fn add(&mut self, node: &NodeRef, event: &str, name: &str) -> bool {
        if self.contains(node, event, name) {
            return false;
        }
        self.actions.push(RegisteredAction {
            node: node.clone(),
            event: event.to_string(),
            name: name.to_string(),
        });
        true
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredAction> {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_add_is_idempotent_per_triple() {
        let doc = Document::parse("<button></button><a></a>").unwrap();
        let nodes = doc.body().element_children();
        let (button, link) = (&nodes[0], &nodes[1]);

        let mut registry = ActionRegistry::new();
        assert!(registry.add(button, "click", "save"));
        assert!(!registry.add(button, "click", "save"));
        assert!(registry.add(button, "focus", "save"));
        assert!(registry.add(link, "click", "save"));
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(link, "click", "save"));
        assert!(!registry.contains(link, "click", "other"));

        let names: Vec<&str> = registry.iter().map(|a| a.event.as_str()).collect();
        assert_eq!(names, vec!["click", "focus", "click"]);

        registry.clear();
        assert!(registry.is_empty());
    }
}
