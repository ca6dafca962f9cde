//! # Hosts & Controller Lifecycle
//!
//! A [`Host`] wraps one component element. It owns:
//!
//! 1. **The action table**: named handlers that declarative markup may bind
//!    to. Lookups are checked; a missing name is a normal `None`.
//! 2. **The controller list**: lifecycle notifications (connected,
//!    disconnected, updated, attribute changed) are forwarded to every
//!    registered [`Controller`] in registration order.
//!
//! Controllers keep a [`WeakHost`], so a host and its controllers never form
//! a reference cycle.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::{Document, Event, NodeRef};
use crate::error::{ControllerError, Result};

/// A host method that can be bound to an event.
pub type ActionHandler = Rc<dyn Fn(&Event)>;

/// Lifecycle hooks a host forwards to its controllers. All default to no-ops.
pub trait Controller {
    fn host_connected(&self) {}

    fn host_disconnected(&self) {}

    /// Called after each render of the host.
    fn host_updated(&self) {}

    fn host_attribute_changed(&self, _name: &str, _old: Option<&str>, _new: Option<&str>) {}
}

/// Options shared by the action binder and the target resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerOptions {
    /// Operate on the host's shadow root instead of its light DOM.
    pub shadow: bool,
}

impl ControllerOptions {
    pub fn light() -> Self {
        Self { shadow: false }
    }

    pub fn shadow() -> Self {
        Self { shadow: true }
    }
}

struct HostInner {
    document: Rc<Document>,
    element: NodeRef,
    tag_name: String,
    actions: RefCell<HashMap<String, ActionHandler>>,
    controllers: RefCell<Vec<Rc<dyn Controller>>>,
    connected: Cell<bool>,
}

#[derive(Clone)]
pub struct Host {
    inner: Rc<HostInner>,
}

#[derive(Clone)]
pub struct WeakHost {
    inner: Weak<HostInner>,
}

impl WeakHost {
    pub fn upgrade(&self) -> Option<Host> {
        self.inner.upgrade().map(|inner| Host { inner })
    }
}

impl Host {
    pub fn new(document: Rc<Document>, element: NodeRef) -> Result<Self> {
        let tag_name = element
            .local_name()
            .ok_or(ControllerError::NotAnElement)?
            .to_ascii_lowercase();

        Ok(Self {
            inner: Rc::new(HostInner {
                document,
                element,
                tag_name,
                actions: RefCell::new(HashMap::new()),
                controllers: RefCell::new(Vec::new()),
                connected: Cell::new(false),
            }),
        })
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.inner.document
    }

    pub fn element(&self) -> &NodeRef {
        &self.inner.element
    }

    pub fn tag_name(&self) -> &str {
        &self.inner.tag_name
    }

    pub fn downgrade(&self) -> WeakHost {
        WeakHost {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn attach_shadow(&self) -> Result<NodeRef> {
        self.inner.document.attach_shadow(&self.inner.element)
    }

    pub fn shadow_root(&self) -> Option<NodeRef> {
        self.inner.document.shadow_root(&self.inner.element)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Action table
    // ───────────────────────────────────────────────────────────────────────────

    /// Make `handler` callable from markup as `name`. Replaces an existing entry.
    pub fn define_action<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Event) + 'static,
    {
        self.inner
            .actions
            .borrow_mut()
            .insert(name.into(), Rc::new(handler));
    }

    pub fn action(&self, name: &str) -> Option<ActionHandler> {
        self.inner.actions.borrow().get(name).cloned()
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.inner.actions.borrow().contains_key(name)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ───────────────────────────────────────────────────────────────────────────

    /// Register a controller. If the host is already connected the
    /// controller is connected immediately.
    pub fn add_controller(&self, controller: Rc<dyn Controller>) {
        self.inner.controllers.borrow_mut().push(controller.clone());
        if self.is_connected() {
            controller.host_connected();
        }
    }

    pub fn controller_count(&self) -> usize {
        self.inner.controllers.borrow().len()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.get()
    }

    /// Start forwarding attribute changes and notify controllers that the
    /// host is in the document. Calling it while connected does nothing.
    pub fn connect(&self) {
        if self.is_connected() {
            return;
        }

        let weak = self.downgrade();
        self.inner.document.set_attribute_callback(
            &self.inner.element,
            Rc::new(move |name, old, new| {
                if let Some(host) = weak.upgrade() {
                    host.attribute_changed(name, old, new);
                }
            }),
        );

        // Set first: controllers added while connecting start right away.
        self.inner.connected.set(true);
        debug!(host = %self.tag_name(), "host connected");
        for controller in self.controllers() {
            controller.host_connected();
        }
    }

    pub fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }

        debug!(host = %self.tag_name(), "host disconnected");
        for controller in self.controllers() {
            controller.host_disconnected();
        }
        self.inner
            .document
            .clear_attribute_callback(&self.inner.element);
        self.inner.connected.set(false);
    }

    /// Post-render notification.
    pub fn updated(&self) {
        for controller in self.controllers() {
            controller.host_updated();
        }
    }

    pub fn attribute_changed(&self, name: &str, old: Option<&str>, new: Option<&str>) {
        for controller in self.controllers() {
            controller.host_attribute_changed(name, old, new);
        }
    }

    // Snapshot so controllers can register further controllers while notified.
    fn controllers(&self) -> Vec<Rc<dyn Controller>> {
        self.inner.controllers.borrow().clone()
    }
}
