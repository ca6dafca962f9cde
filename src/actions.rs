//! # Declarative Actions
//!
//! Binds markup like `<button x-widget-action="click->save">` to the host
//! action `save`. The binder scans its effective root (the host element, or
//! its shadow root in shadow mode) when the host connects, then keeps up with
//! the tree through a mutation observer.
//!
//! ## Attribute syntax
//!
//! Whitespace-separated declarations, each one of:
//!
//! - `event->action`
//! - `event#action`
//! - `action` (event inferred from the element, see [`default_event_for`])
//!
//! ## Invariants
//!
//! 1. **Idempotence**: a `(node, event, action)` triple is bound at most once
//!    per connection, however often its change is redelivered.
//! 2. **Scope**: declarations on or inside a nested element with the host's tag are
//!    left to that nested instance. Attribute changes bypass the check.
//! 3. **Soft misses**: declarations naming an undefined action are skipped and
//!    never retried.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::dom::{ChangeRecord, Document, NodeRef, ObserverId};
use crate::host::{Controller, ControllerOptions, Host, WeakHost};
use crate::registry::{ActionRegistry, RegisteredAction};
use crate::scope::TreeScope;

/// Action attribute used by shadow-mode binders, whatever the host tag.
pub const SHADOW_ACTION_ATTRIBUTE: &str = "host-action";

/// One parsed `event->action` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDeclaration {
    pub event: String,
    pub action: String,
}

impl ActionDeclaration {
    /// Parse one token; `default_event` is used when the token names no event.
    /// Returns `None` for tokens without an action name.
    pub fn parse(token: &str, default_event: &str) -> Option<Self> {
        let (event, action) = if let Some((event, action)) = token.split_once("->") {
            (event.trim(), action)
        } else if let Some((event, action)) = token.split_once('#') {
            (event.trim(), action)
        } else {
            (default_event, token)
        };

        if action.is_empty() {
            return None;
        }
        let event = if event.is_empty() { default_event } else { event };
        Some(Self {
            event: event.to_string(),
            action: action.to_string(),
        })
    }
}

/// Parse a full action attribute value.
pub fn parse_action_declarations(value: &str, default_event: &str) -> Vec<ActionDeclaration> {
    value
        .split_whitespace()
        .filter_map(|token| ActionDeclaration::parse(token, default_event))
        .collect()
}

/// Default event for an element with tag `tag` and `type` attribute `type_attr`.
pub fn default_event_for(tag: &str, type_attr: Option<&str>) -> &'static str {
    match tag.to_ascii_lowercase().as_str() {
        "form" => "submit",
        "input" | "textarea" => {
            if type_attr == Some("submit") {
                "click"
            } else {
                "input"
            }
        }
        "select" => "change",
        _ => "click",
    }
}

pub fn default_event_for_node(node: &NodeRef) -> &'static str {
    default_event_for(
        node.local_name().unwrap_or_default(),
        node.attribute("type").as_deref(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinderState {
    Unattached,
    Attached,
}

struct BinderInner {
    host: WeakHost,
    document: Rc<Document>,
    element: NodeRef,
    tag_name: String,
    shadow: bool,
    attribute: String,
    state: BinderState,
    connected: bool,
    // Set once a connection has been torn down; a binder is not reattached.
    retired: bool,
    observer: Option<ObserverId>,
    registry: ActionRegistry,
    first_updated: bool,
}

/// Mutation-driven declarative action binder. Cloning yields another handle
/// to the same binder.
#[derive(Clone)]
pub struct ActionBinder {
    inner: Rc<RefCell<BinderInner>>,
}

impl ActionBinder {
    /// Create a binder and register it with `host`.
    pub fn new(host: &Host, options: ControllerOptions) -> Self {
        let attribute = if options.shadow {
            SHADOW_ACTION_ATTRIBUTE.to_string()
        } else {
            format!("{}-action", host.tag_name())
        };

        let binder = Self {
            inner: Rc::new(RefCell::new(BinderInner {
                host: host.downgrade(),
                document: host.document().clone(),
                element: host.element().clone(),
                tag_name: host.tag_name().to_string(),
                shadow: options.shadow,
                attribute,
                state: BinderState::Unattached,
                connected: false,
                retired: false,
                observer: None,
                registry: ActionRegistry::new(),
                first_updated: false,
            })),
        };
        host.add_controller(Rc::new(binder.clone()));
        binder
    }

    pub fn state(&self) -> BinderState {
        self.inner.borrow().state
    }

    pub fn is_shadow(&self) -> bool {
        self.inner.borrow().shadow
    }

    pub fn action_attribute(&self) -> String {
        self.inner.borrow().attribute.clone()
    }

    pub fn effective_root(&self) -> Option<NodeRef> {
        self.inner.borrow().effective_root()
    }

    pub fn registered_actions(&self) -> Vec<RegisteredAction> {
        self.inner.borrow().registry.iter().cloned().collect()
    }

    /// Handle a batch of tree changes. This is what the observer calls.
    pub fn process_changes(&self, records: &[ChangeRecord]) {
        self.inner.borrow_mut().handle_changes(records);
    }

    fn connect(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state == BinderState::Attached {
            return;
        }
        if inner.retired {
            debug!(host = %inner.tag_name, "disconnected action binder is not reattached");
            return;
        }

        inner.connected = true;
        inner.registry.clear();
        let Some(root) = inner.effective_root() else {
            debug!(host = %inner.tag_name, "no shadow root yet, binding waits for first render");
            return;
        };

        // Light DOM: the host's own declaration arrives as an attribute change.
        let initial = if inner.shadow {
            vec![]
        } else {
            vec![ChangeRecord::Attribute {
                target: inner.element.clone(),
                name: inner.attribute.clone(),
                old_value: None,
            }]
        };
        inner.handle_changes(&initial);
        self.observe(&mut inner, &root);
    }

    fn observe(&self, inner: &mut BinderInner, root: &NodeRef) {
        let weak: Weak<RefCell<BinderInner>> = Rc::downgrade(&self.inner);
        let observer = inner.document.observe(
            root,
            Rc::new(move |records: &[ChangeRecord]| {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().handle_changes(records);
                }
            }),
        );
        inner.observer = Some(observer);
        inner.state = BinderState::Attached;
    }

    fn disconnect(&self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(observer) = inner.observer.take() {
            inner.document.disconnect(observer);
            inner.retired = true;
        }
        inner.connected = false;
        inner.registry.clear();
        inner.state = BinderState::Unattached;
    }

    /// Catch-up scan after the first render that produced a root. A shadow
    /// root created by that render is observed from here on.
    fn first_render(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.first_updated || inner.retired {
            return;
        }
        let Some(root) = inner.effective_root() else {
            return;
        };

        let record = ChangeRecord::Structural {
            added: root.descendants(),
            target: root.clone(),
            removed: vec![],
        };
        inner.handle_changes(&[record]);
        inner.first_updated = true;

        if inner.connected && inner.state == BinderState::Unattached {
            debug!(host = %inner.tag_name, "root appeared after connect, observing it");
            self.observe(&mut inner, &root);
        }
    }
}

impl Controller for ActionBinder {
    fn host_connected(&self) {
        self.connect();
    }

    fn host_disconnected(&self) {
        self.disconnect();
    }

    fn host_updated(&self) {
        self.first_render();
    }
}

impl BinderInner {
    fn effective_root(&self) -> Option<NodeRef> {
        if self.shadow {
            self.document.shadow_root(&self.element)
        } else {
            Some(self.element.clone())
        }
    }

    fn handle_changes(&mut self, records: &[ChangeRecord]) {
        let Some(root) = self.effective_root() else {
            return;
        };
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let scope = TreeScope::new(&root, &self.tag_name);
        trace!(host = %self.tag_name, records = records.len(), "processing changes");

        if self.observer.is_none() {
            // First run: nothing has been observed yet, so scan everything.
            for node in declaring_descendants(&root, &self.attribute) {
                self.register(&host, &scope, &node, false);
            }
        }

        for record in records {
            match record {
                ChangeRecord::Structural { added, .. } => {
                    for node in added.iter().filter(|node| node.is_element()) {
                        self.register(&host, &scope, node, false);
                        for inside in declaring_descendants(node, &self.attribute) {
                            self.register(&host, &scope, &inside, false);
                        }
                    }
                }
                ChangeRecord::Attribute { target, .. } => {
                    self.register(&host, &scope, target, true);
                }
            }
        }
    }

    fn register(&mut self, host: &Host, scope: &TreeScope, node: &NodeRef, self_scoped: bool) {
        if !self_scoped && !scope.belongs_to(node) {
            return;
        }
        let Some(value) = node.attribute(&self.attribute) else {
            return;
        };

        for declaration in parse_action_declarations(&value, default_event_for_node(node)) {
            if self
                .registry
                .contains(node, &declaration.event, &declaration.action)
            {
                continue;
            }

            match host.action(&declaration.action) {
                Some(handler) => {
                    self.document
                        .add_event_listener(node, &declaration.event, handler);
                    self.registry
                        .add(node, &declaration.event, &declaration.action);
                    debug!(
                        host = %self.tag_name,
                        node = ?node,
                        event = %declaration.event,
                        action = %declaration.action,
                        "bound action"
                    );
                }
                None => {
                    debug!(
                        host = %self.tag_name,
                        node = ?node,
                        action = %declaration.action,
                        "no such action on host, declaration ignored"
                    );
                }
            }
        }
    }
}

fn declaring_descendants(node: &NodeRef, attribute: &str) -> Vec<NodeRef> {
    node.descendants()
        .into_iter()
        .filter(|inside| inside.has_attribute(attribute))
        .collect()
}
