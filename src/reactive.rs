//! # Reactive Properties
//!
//! Keeps a [`Signal`] holding a JSON value and a string attribute on the
//! host element in sync.
//!
//! ## Directions
//!
//! - **Push** (value -> attribute, only when reflecting): runs on every
//!   signal change.
//! - **Pull** (attribute -> value): runs when the host reports a change of
//!   the watched attribute.
//!
//! Each direction is a no-op while the other one is writing, so a push never
//! triggers a pull (the attribute write re-enters through the host's
//! attribute callback) and a pull never triggers a push.
//!
//! ## Type inference
//!
//! The kind of the value is fixed the first time it is known: from the
//! initial value, else from the first write, else from the signal's value at
//! the first pull (`String` if that is still `null`). It decides how attribute strings are parsed from then on.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::dom::{Document, NodeRef};
use crate::host::{Controller, Host};
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Pushing,
    Pulling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Boolean,
    Number,
    Array,
    Object,
    String,
}

impl ValueKind {
    /// `None` for `null`, which says nothing about the intended kind.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Boolean),
            Value::Number(_) => Some(ValueKind::Number),
            Value::Array(_) => Some(ValueKind::Array),
            Value::Object(_) => Some(ValueKind::Object),
            Value::String(_) => Some(ValueKind::String),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactivePropertyOptions {
    /// Property name.
    pub name: String,
    /// Attribute name; defaults to `name`.
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default = "default_reflect")]
    pub reflect: bool,
}

fn default_reflect() -> bool {
    true
}

impl ReactivePropertyOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: None,
            reflect: true,
        }
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn reflect(mut self, reflect: bool) -> Self {
        self.reflect = reflect;
        self
    }
}

/// Attribute form of `value`; `None` means the attribute is removed.
///
/// Every numeric zero, `0.0` and `-0.0` included, is written as the empty
/// string and reads back as the integer `0`.
pub fn attribute_string(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) if n.as_f64() == Some(0.0) => Some(String::new()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

struct PropertyState {
    document: Rc<Document>,
    element: NodeRef,
    name: String,
    attribute: String,
    reflect: bool,
    signal: Signal<Value>,
    phase: Cell<SyncPhase>,
    kind: Cell<Option<ValueKind>>,
}

/// Two-way binding between a value signal and an attribute of the host.
#[derive(Clone)]
pub struct ReactiveProperty {
    state: Rc<PropertyState>,
}

impl ReactiveProperty {
    /// Bind `signal` to the host and register with it, so changes of the
    /// watched attribute are pulled automatically.
    pub fn new(host: &Host, signal: Signal<Value>, options: ReactivePropertyOptions) -> Self {
        let property = Self::detached(host.document().clone(), host.element().clone(), signal, options);
        host.add_controller(Rc::new(property.clone()));
        property
    }

    /// Bind without a host; the caller must forward attribute changes to
    /// [`ReactiveProperty::on_attribute_observed`].
    pub fn detached(
        document: Rc<Document>,
        element: NodeRef,
        signal: Signal<Value>,
        options: ReactivePropertyOptions,
    ) -> Self {
        let kind = signal.with(ValueKind::of);
        let state = Rc::new(PropertyState {
            document,
            element,
            attribute: options.attribute.unwrap_or_else(|| options.name.clone()),
            name: options.name,
            reflect: options.reflect,
            signal,
            phase: Cell::new(SyncPhase::Idle),
            kind: Cell::new(kind),
        });

        if state.reflect {
            let weak: Weak<PropertyState> = Rc::downgrade(&state);
            state.signal.subscribe(move |value| {
                if let Some(state) = weak.upgrade() {
                    state.push(value);
                }
            });
        }

        Self { state }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn attribute(&self) -> &str {
        &self.state.attribute
    }

    pub fn reflects(&self) -> bool {
        self.state.reflect
    }

    pub fn kind(&self) -> Option<ValueKind> {
        self.state.kind.get()
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.phase.get()
    }

    pub fn signal(&self) -> &Signal<Value> {
        &self.state.signal
    }

    /// Property getter.
    pub fn read(&self) -> Value {
        self.state.signal.get()
    }

    /// Property setter. Reflects to the attribute if enabled.
    pub fn write(&self, value: Value) {
        if self.state.kind.get().is_none() {
            self.state.kind.set(ValueKind::of(&value));
        }
        self.state.signal.set(value);
    }

    /// Pull a new raw attribute value (`None` = attribute removed).
    pub fn on_attribute_observed(&self, raw: Option<&str>) {
        self.state.pull(raw);
    }

    /// Pull whatever the element currently carries.
    pub fn refresh_from_attribute(&self) {
        let raw = self.state.element.attribute(&self.state.attribute);
        self.state.pull(raw.as_deref());
    }
}

impl Controller for ReactiveProperty {
    // Mirrors custom-element upgrade: an attribute present at connection wins.
    fn host_connected(&self) {
        if self.state.element.has_attribute(&self.state.attribute) {
            self.refresh_from_attribute();
        }
    }

    fn host_attribute_changed(&self, name: &str, _old: Option<&str>, new: Option<&str>) {
        if name.eq_ignore_ascii_case(&self.state.attribute) {
            self.on_attribute_observed(new);
        }
    }
}

impl PropertyState {
    fn push(&self, value: &Value) {
        if self.phase.get() != SyncPhase::Idle {
            return;
        }
        self.phase.set(SyncPhase::Pushing);

        let result = match attribute_string(value) {
            Some(text) => self
                .document
                .set_attribute(&self.element, &self.attribute, &text),
            None => self
                .document
                .remove_attribute(&self.element, &self.attribute)
                .map(|_| ()),
        };
        if let Err(err) = result {
            warn!(property = %self.name, attribute = %self.attribute, "failed to reflect: {}", err);
        }

        self.phase.set(SyncPhase::Idle);
    }

    fn pull(&self, raw: Option<&str>) {
        if self.phase.get() == SyncPhase::Pushing {
            return;
        }
        self.phase.set(SyncPhase::Pulling);

        // The signal may have been written directly, bypassing `write`.
        let kind = match self.kind.get() {
            Some(kind) => kind,
            None => {
                let kind = self.signal.with(ValueKind::of).unwrap_or(ValueKind::String);
                self.kind.set(Some(kind));
                kind
            }
        };
        let value = self.coerce(kind, raw);
        self.signal.set(value);

        self.phase.set(SyncPhase::Idle);
    }

    fn coerce(&self, kind: ValueKind, raw: Option<&str>) -> Value {
        match kind {
            ValueKind::Boolean => Value::Bool(raw.map(|s| !s.is_empty()).unwrap_or(false)),
            ValueKind::Number => match parse_number(raw) {
                Some(number) => number,
                None => {
                    warn!(
                        "{:?} is not a number for {}[{}]",
                        raw.unwrap_or_default(),
                        self.tag(),
                        self.attribute
                    );
                    Value::Null
                }
            },
            ValueKind::Array | ValueKind::Object => {
                let empty = if kind == ValueKind::Array {
                    Value::Array(vec![])
                } else {
                    Value::Object(serde_json::Map::new())
                };
                match raw.filter(|s| !s.is_empty()) {
                    None => empty,
                    Some(text) => serde_json::from_str(text).unwrap_or_else(|err| {
                        warn!("{} for {}[{}]", err, self.tag(), self.attribute);
                        empty
                    }),
                }
            }
            ValueKind::String => raw.map(|s| Value::String(s.to_string())).unwrap_or(Value::Null),
        }
    }

    fn tag(&self) -> &str {
        self.element.local_name().unwrap_or_default()
    }
}

/// Numeric attribute parsing: missing or blank is zero, integers stay integers.
fn parse_number(raw: Option<&str>) -> Option<Value> {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Some(Value::from(0));
    }
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    if let Ok(uint) = text.parse::<u64>() {
        return Some(Value::from(uint));
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}
