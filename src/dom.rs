//! # Element Tree
//!
//! The controllers run against an html5ever-parsed `markup5ever_rcdom` tree.
//! This module adds the pieces a browser would supply on top of the parse
//! tree:
//!
//! - element identity (`NodeRef` compares by pointer)
//! - mutation primitives that queue `ChangeRecord`s for observers
//! - batched, ordered delivery of those records (`deliver_mutations`)
//! - event listeners with bubbling
//! - shadow roots (detached document nodes keyed by their host)
//! - synchronous attribute callbacks, like `attributeChangedCallback`
//!
//! Everything is single-threaded. No callback is invoked while a borrow of
//! the document state is held, so callbacks may freely mutate the tree,
//! add listeners or register observers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};
use tendril::StrTendril;
use tracing::trace;

use crate::error::{ControllerError, Result};
use crate::selector::Selector;

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

/// A handle to a node in the tree. Two refs are equal iff they point at the
/// same node.
#[derive(Clone)]
pub struct NodeRef(Handle);

impl NodeRef {
    fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.data, NodeData::Element { .. })
    }

    /// Lowercase tag name for elements, `None` for every other node type.
    pub fn local_name(&self) -> Option<&str> {
        match &self.0.data {
            NodeData::Element { name, .. } => Some(&*name.local),
            _ => None,
        }
    }

    /// Returns true if this is an element whose tag equals `tag` (ASCII case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.local_name()
            .map(|name| name.eq_ignore_ascii_case(tag))
            .unwrap_or(false)
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.0.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|attr| (&*attr.name.local).eq_ignore_ascii_case(name))
                .map(|attr| attr.value.to_string()),
            _ => None,
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        match &self.0.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .any(|attr| (&*attr.name.local).eq_ignore_ascii_case(name)),
            _ => false,
        }
    }

    pub fn parent(&self) -> Option<NodeRef> {
        let weak = self.0.parent.take();
        let parent = weak.as_ref().and_then(|w| w.upgrade());
        self.0.parent.set(weak);
        parent.map(NodeRef)
    }

    pub fn parent_element(&self) -> Option<NodeRef> {
        self.parent().filter(NodeRef::is_element)
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.0.children.borrow().iter().cloned().map(NodeRef).collect()
    }

    pub fn element_children(&self) -> Vec<NodeRef> {
        self.children().into_iter().filter(NodeRef::is_element).collect()
    }

    /// Inclusive containment, like `Node.contains`.
    pub fn contains(&self, other: &NodeRef) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Nearest inclusive ancestor element with the given tag.
    pub fn closest(&self, tag: &str) -> Option<NodeRef> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.has_tag(tag) {
                return Some(node);
            }
            current = node.parent_element();
        }
        None
    }

    /// All descendant elements in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeRef> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            if node.is_element() {
                out.push(node);
            }
        }
        out
    }

    pub fn query_selector(&self, selector: &Selector) -> Option<NodeRef> {
        self.descendants()
            .into_iter()
            .find(|node| selector.matches(node))
    }

    pub fn query_selector_all(&self, selector: &Selector) -> Vec<NodeRef> {
        self.descendants()
            .into_iter()
            .filter(|node| selector.matches(node))
            .collect()
    }

    /// Parses `selector` and returns all matching descendants.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeRef>> {
        Ok(self.query_selector_all(&Selector::parse(selector)?))
    }

    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.0, &mut text);
        text
    }
}

fn collect_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, out);
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.data {
            NodeData::Element { name, .. } => match self.attribute("id") {
                Some(id) => write!(f, "<{}#{}>", name.local, id),
                None => write!(f, "<{}>", name.local),
            },
            NodeData::Text { .. } => f.write_str("#text"),
            NodeData::Document => f.write_str("#document"),
            NodeData::Comment { .. } => f.write_str("#comment"),
            _ => f.write_str("#node"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHANGE RECORDS & EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// One observed tree mutation.
#[derive(Debug, Clone)]
pub enum ChangeRecord {
    /// Children were added to and/or removed from `target`.
    Structural {
        target: NodeRef,
        added: Vec<NodeRef>,
        removed: Vec<NodeRef>,
    },
    /// An attribute of `target` was set or removed.
    Attribute {
        target: NodeRef,
        name: String,
        old_value: Option<String>,
    },
}

impl ChangeRecord {
    pub fn target(&self) -> &NodeRef {
        match self {
            ChangeRecord::Structural { target, .. } | ChangeRecord::Attribute { target, .. } => {
                target
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: NodeRef,
    pub current_target: NodeRef,
}

pub type EventListener = Rc<dyn Fn(&Event)>;
pub type MutationCallback = Rc<dyn Fn(&[ChangeRecord])>;
/// `(name, old_value, new_value)`; `None` means absent.
pub type AttributeCallback = Rc<dyn Fn(&str, Option<&str>, Option<&str>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

struct ObserverEntry {
    id: ObserverId,
    root: NodeRef,
    callback: MutationCallback,
}

#[derive(Default)]
struct DocumentState {
    listeners: HashMap<NodeRef, Vec<(String, EventListener)>>,
    observers: Vec<ObserverEntry>,
    pending: Vec<(ObserverId, ChangeRecord)>,
    shadow_roots: HashMap<NodeRef, NodeRef>,
    attribute_callbacks: HashMap<NodeRef, AttributeCallback>,
    next_observer: u64,
}

pub struct Document {
    // Keeps the parsed tree alive; `body` hangs off it.
    _root: Handle,
    body: NodeRef,
    state: RefCell<DocumentState>,
}

impl Document {
    /// Parse a full document. The `<body>` element is the root that
    /// fixtures and components live under.
    pub fn parse(html: &str) -> Result<Rc<Document>> {
        let dom = parse_html(html)?;
        let root = dom.document.clone();
        let body = find_body(&root).unwrap_or_else(|| NodeRef(root.clone()));

        Ok(Rc::new(Document {
            _root: root,
            body,
            state: RefCell::new(DocumentState::default()),
        }))
    }

    /// Parse `html` into detached nodes (elements and text) that can be
    /// inserted with [`Document::append_child`].
    pub fn fragment(html: &str) -> Result<Vec<NodeRef>> {
        let dom = parse_html(html)?;
        let Some(body) = find_body(&dom.document) else {
            return Ok(Vec::new());
        };

        let children: Vec<Handle> = body.0.children.borrow_mut().drain(..).collect();
        Ok(children
            .into_iter()
            .map(|child| {
                child.parent.set(None);
                NodeRef(child)
            })
            .collect())
    }

    pub fn body(&self) -> &NodeRef {
        &self.body
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Structure
    // ───────────────────────────────────────────────────────────────────────────

    /// Append `child` to `parent`, moving it if it is already attached.
    pub fn append_child(&self, parent: &NodeRef, child: &NodeRef) {
        if let Some(old_parent) = child.parent() {
            self.remove_child(&old_parent, child);
        }
        attach(parent, child);
        self.queue(ChangeRecord::Structural {
            target: parent.clone(),
            added: vec![child.clone()],
            removed: vec![],
        });
    }

    /// Parse `html` and append every resulting node to `parent`.
    pub fn append_html(&self, parent: &NodeRef, html: &str) -> Result<Vec<NodeRef>> {
        let nodes = Document::fragment(html)?;
        for node in &nodes {
            attach(parent, node);
        }
        self.queue(ChangeRecord::Structural {
            target: parent.clone(),
            added: nodes.clone(),
            removed: vec![],
        });
        Ok(nodes)
    }

    /// Returns false if `child` was not a child of `parent`.
    pub fn remove_child(&self, parent: &NodeRef, child: &NodeRef) -> bool {
        let removed = {
            let mut children = parent.0.children.borrow_mut();
            match children.iter().position(|c| Rc::ptr_eq(c, &child.0)) {
                Some(index) => {
                    children.remove(index);
                    true
                }
                None => false,
            }
        };
        if !removed {
            return false;
        }

        child.0.parent.set(None);
        self.queue(ChangeRecord::Structural {
            target: parent.clone(),
            added: vec![],
            removed: vec![child.clone()],
        });
        true
    }

    pub fn remove(&self, node: &NodeRef) -> bool {
        match node.parent() {
            Some(parent) => self.remove_child(&parent, node),
            None => false,
        }
    }

    /// Replace the children of `parent` with the parsed `html`, as one change record.
    pub fn set_inner_html(&self, parent: &NodeRef, html: &str) -> Result<()> {
        let added = Document::fragment(html)?;

        let removed: Vec<NodeRef> = parent
            .0
            .children
            .borrow_mut()
            .drain(..)
            .map(NodeRef)
            .collect();
        for node in &removed {
            node.0.parent.set(None);
        }
        for node in &added {
            attach(parent, node);
        }

        self.queue(ChangeRecord::Structural {
            target: parent.clone(),
            added,
            removed,
        });
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Attributes
    // ───────────────────────────────────────────────────────────────────────────

    pub fn set_attribute(&self, element: &NodeRef, name: &str, value: &str) -> Result<()> {
        let NodeData::Element { attrs, .. } = &element.0.data else {
            return Err(ControllerError::NotAnElement);
        };
        let name = name.to_ascii_lowercase();

        let old_value = {
            let mut attrs = attrs.borrow_mut();
            match attrs.iter_mut().find(|attr| *attr.name.local == *name) {
                Some(attr) => {
                    let old = attr.value.to_string();
                    attr.value = StrTendril::from_slice(value);
                    Some(old)
                }
                None => {
                    attrs.push(Attribute {
                        name: QualName::new(None, Namespace::from(""), LocalName::from(&*name)),
                        value: StrTendril::from_slice(value),
                    });
                    None
                }
            }
        };

        self.queue(ChangeRecord::Attribute {
            target: element.clone(),
            name: name.clone(),
            old_value: old_value.clone(),
        });
        self.notify_attribute(element, &name, old_value.as_deref(), Some(value));
        Ok(())
    }

    /// Returns false if the attribute was not present.
    pub fn remove_attribute(&self, element: &NodeRef, name: &str) -> Result<bool> {
        let NodeData::Element { attrs, .. } = &element.0.data else {
            return Err(ControllerError::NotAnElement);
        };
        let name = name.to_ascii_lowercase();

        let old_value = {
            let mut attrs = attrs.borrow_mut();
            attrs
                .iter()
                .position(|attr| *attr.name.local == *name)
                .map(|index| attrs.remove(index).value.to_string())
        };
        let Some(old_value) = old_value else {
            return Ok(false);
        };

        self.queue(ChangeRecord::Attribute {
            target: element.clone(),
            name: name.clone(),
            old_value: Some(old_value.clone()),
        });
        self.notify_attribute(element, &name, Some(&old_value), None);
        Ok(true)
    }

    /// Register the callback run synchronously after every attribute
    /// mutation on `element`. Replaces any previous callback.
    pub fn set_attribute_callback(&self, element: &NodeRef, callback: AttributeCallback) {
        self.state
            .borrow_mut()
            .attribute_callbacks
            .insert(element.clone(), callback);
    }

    pub fn clear_attribute_callback(&self, element: &NodeRef) {
        self.state.borrow_mut().attribute_callbacks.remove(element);
    }

    fn notify_attribute(&self, element: &NodeRef, name: &str, old: Option<&str>, new: Option<&str>) {
        let callback = self.state.borrow().attribute_callbacks.get(element).cloned();
        if let Some(callback) = callback {
            callback(name, old, new);
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Shadow roots
    // ───────────────────────────────────────────────────────────────────────────

    /// Attach (or return the existing) shadow root of `host`.
    pub fn attach_shadow(&self, host: &NodeRef) -> Result<NodeRef> {
        if !host.is_element() {
            return Err(ControllerError::NotAnElement);
        }
        let mut state = self.state.borrow_mut();
        let shadow = state
            .shadow_roots
            .entry(host.clone())
            .or_insert_with(|| NodeRef(Node::new(NodeData::Document)))
            .clone();
        Ok(shadow)
    }

    pub fn shadow_root(&self, host: &NodeRef) -> Option<NodeRef> {
        self.state.borrow().shadow_roots.get(host).cloned()
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Events
    // ───────────────────────────────────────────────────────────────────────────

    pub fn add_event_listener(&self, node: &NodeRef, event_type: &str, listener: EventListener) {
        self.state
            .borrow_mut()
            .listeners
            .entry(node.clone())
            .or_default()
            .push((event_type.to_string(), listener));
    }

    pub fn listener_count(&self, node: &NodeRef, event_type: &str) -> usize {
        self.state
            .borrow()
            .listeners
            .get(node)
            .map(|listeners| listeners.iter().filter(|(t, _)| t == event_type).count())
            .unwrap_or(0)
    }

    /// Dispatch an event at `target`, bubbling through its ancestors. Does not
    /// cross a shadow boundary. Returns the number of listeners invoked.
    pub fn dispatch_event(&self, target: &NodeRef, event_type: &str) -> usize {
        let mut invoked = 0;
        let mut current = Some(target.clone());

        while let Some(node) = current {
            let listeners: Vec<EventListener> = self
                .state
                .borrow()
                .listeners
                .get(&node)
                .map(|listeners| {
                    listeners
                        .iter()
                        .filter(|(t, _)| t == event_type)
                        .map(|(_, l)| l.clone())
                        .collect()
                })
                .unwrap_or_default();

            let event = Event {
                event_type: event_type.to_string(),
                target: target.clone(),
                current_target: node.clone(),
            };
            for listener in listeners {
                listener(&event);
                invoked += 1;
            }

            current = node.parent();
        }

        invoked
    }

    pub fn click(&self, target: &NodeRef) -> usize {
        self.dispatch_event(target, "click")
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Mutation observers
    // ───────────────────────────────────────────────────────────────────────────

    /// Observe structural and attribute changes in the subtree of `root`
    /// (inclusive).
    pub fn observe(&self, root: &NodeRef, callback: MutationCallback) -> ObserverId {
        let mut state = self.state.borrow_mut();
        state.next_observer += 1;
        let id = ObserverId(state.next_observer);
        state.observers.push(ObserverEntry {
            id,
            root: root.clone(),
            callback,
        });
        id
    }

    /// Stop an observer and drop its undelivered records. Unknown ids are ignored.
    pub fn disconnect(&self, id: ObserverId) {
        let mut state = self.state.borrow_mut();
        state.observers.retain(|entry| entry.id != id);
        state.pending.retain(|(observer, _)| *observer != id);
    }

    pub fn is_observing(&self, id: ObserverId) -> bool {
        self.state.borrow().observers.iter().any(|entry| entry.id == id)
    }

    /// Deliver queued records, one ordered batch per observer, until the
    /// queue stays empty. Returns the number of records delivered.
    pub fn deliver_mutations(&self) -> usize {
        let mut delivered = 0;

        loop {
            let (pending, observers) = {
                let mut state = self.state.borrow_mut();
                if state.pending.is_empty() {
                    break;
                }
                let observers: Vec<(ObserverId, MutationCallback)> = state
                    .observers
                    .iter()
                    .map(|entry| (entry.id, entry.callback.clone()))
                    .collect();
                (std::mem::take(&mut state.pending), observers)
            };

            for (id, callback) in observers {
                let batch: Vec<ChangeRecord> = pending
                    .iter()
                    .filter(|(observer, _)| *observer == id)
                    .map(|(_, record)| record.clone())
                    .collect();
                // An earlier callback in this round may have disconnected it.
                if batch.is_empty() || !self.is_observing(id) {
                    continue;
                }
                trace!(records = batch.len(), "delivering mutation batch");
                delivered += batch.len();
                callback(&batch);
            }
        }

        delivered
    }

    fn queue(&self, record: ChangeRecord) {
        let mut state = self.state.borrow_mut();
        let matching: Vec<ObserverId> = state
            .observers
            .iter()
            .filter(|entry| entry.root.contains(record.target()))
            .map(|entry| entry.id)
            .collect();
        for id in matching {
            state.pending.push((id, record.clone()));
        }
    }
}

fn attach(parent: &NodeRef, child: &NodeRef) {
    parent.0.children.borrow_mut().push(child.0.clone());
    child.0.parent.set(Some(Rc::downgrade(&parent.0)));
}

fn parse_html(html: &str) -> Result<RcDom> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;
    Ok(dom)
}

fn find_body(handle: &Handle) -> Option<NodeRef> {
    for child in handle.children.borrow().iter() {
        let node = NodeRef(child.clone());
        if node.has_tag("body") {
            return Some(node);
        }
        if node.has_tag("html") {
            if let Some(body) = find_body(child) {
                return Some(body);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_names_ignore_case() {
        let doc = Document::parse(r#"<x-widget data-Mode="dark"></x-widget>"#).unwrap();
        let element = doc.body().element_children().remove(0);

        assert_eq!(element.attribute("data-mode").as_deref(), Some("dark"));
        assert_eq!(element.attribute("DATA-MODE").as_deref(), Some("dark"));
        assert!(element.has_attribute("Data-Mode"));
        assert!(!element.has_attribute("data-theme"));

        doc.set_attribute(&element, "Data-Theme", "light").unwrap();
        assert_eq!(element.attribute("data-theme").as_deref(), Some("light"));
        assert!(doc.remove_attribute(&element, "DATA-THEME").unwrap());
        assert!(!element.has_attribute("data-theme"));
    }
}
