//! # Crystalline Controllers
//!
//! Declarative behavior for web-component hosts.
//!
//! ## Controllers
//!
//! 1. **Actions** ([`ActionBinder`]): `<host-tag>-action="event->method"`
//!    attributes in the host's light DOM (or `host-action` in its shadow
//!    root) bind events to named host actions. New markup is picked up
//!    through a mutation observer.
//!
//! 2. **Targets** ([`TargetResolver`]): `<host-tag>-target="name"` marks
//!    descendants that the host reads back through live accessors.
//!
//! 3. **Reactive properties** ([`ReactiveProperty`]): a typed value kept in
//!    sync with a string attribute, in both directions.
//!
//! ## Scoping
//!
//! A host's scope stops at nested elements with the same tag. Markup inside
//! `<x-widget><x-widget>…</x-widget></x-widget>` belongs to the inner
//! instance only, however deep the nesting goes.
//!
//! ## Threading
//!
//! Everything is single-threaded (`Rc`/`RefCell`) and driven by callbacks:
//! lifecycle notifications from the [`Host`], mutation batches from
//! [`Document::deliver_mutations`], and dispatched events.

mod actions;
mod crystallized;
mod dom;
mod error;
mod host;
mod reactive;
mod registry;
mod scope;
mod selector;
mod signal;
mod targets;

#[cfg(feature = "napi")]
mod bridge;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod target_tests;

pub use actions::{
    default_event_for, default_event_for_node, parse_action_declarations, ActionBinder,
    ActionDeclaration, BinderState, SHADOW_ACTION_ATTRIBUTE,
};
pub use crystallized::CrystallizedController;
pub use dom::{
    AttributeCallback, ChangeRecord, Document, Event, EventListener, MutationCallback, NodeRef,
    ObserverId,
};
pub use error::{ControllerError, Result};
pub use host::{ActionHandler, Controller, ControllerOptions, Host, WeakHost};
pub use reactive::{
    attribute_string, ReactiveProperty, ReactivePropertyOptions, SyncPhase, ValueKind,
};
pub use registry::{ActionRegistry, RegisteredAction};
pub use scope::{belongs_to, TreeScope};
pub use selector::Selector;
pub use signal::{Signal, SubscriptionId};
pub use targets::{
    kebab_case, targetize_selector, TargetAccessor, TargetResolver, TargetSpec, TargetValue,
    SHADOW_TARGET_PREFIX,
};

#[cfg(feature = "napi")]
pub use bridge::{
    kebab_case_native, parse_action_declarations_native, targetize_selector_native,
};
