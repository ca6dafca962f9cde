//! # Targets
//!
//! Named, live accessors for descendants marked with a target attribute.
//!
//! | declaration           | selector (host `x-widget`)             | read      |
//! |-----------------------|----------------------------------------|-----------|
//! | `"@"` for `dupMessage`| `*[x-widget-target='dup-message']`     | one       |
//! | `"div.@foo"`          | `div.[x-widget-target='foo']`          | one       |
//! | `["button"]`          | `button`                               | all       |
//!
//! Reads re-query the tree every time. In light mode a match only counts if
//! it belongs to this host rather than a nested instance with the same tag;
//! shadow roots are already encapsulated and skip that check.

use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeRef};
use crate::error::Result;
use crate::host::{ControllerOptions, Host};
use crate::scope::TreeScope;
use crate::selector::Selector;

/// Target attribute prefix used by shadow-mode resolvers.
pub const SHADOW_TARGET_PREFIX: &str = "host";

lazy_static! {
    static ref TARGET_TOKEN_RE: Regex = Regex::new(r"@([A-Za-z0-9_-]+)").unwrap();
    static ref CAMEL_BOUNDARY_RE: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
}

/// How a target is declared: a selector for one element, or a one-element
/// array holding a selector for all elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    Single(String),
    Multi([String; 1]),
}

impl TargetSpec {
    pub fn single(selector: impl Into<String>) -> Self {
        TargetSpec::Single(selector.into())
    }

    pub fn multi(selector: impl Into<String>) -> Self {
        TargetSpec::Multi([selector.into()])
    }

    pub fn selector(&self) -> &str {
        match self {
            TargetSpec::Single(selector) => selector,
            TargetSpec::Multi([selector]) => selector,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, TargetSpec::Multi(_))
    }
}

/// Result of reading a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetValue {
    One(Option<NodeRef>),
    Many(Vec<NodeRef>),
}

/// `fooBar` / `FooBar` / `foo_bar` -> `foo-bar`.
pub fn kebab_case(name: &str) -> String {
    CAMEL_BOUNDARY_RE
        .replace_all(name, "$1-$2")
        .replace('_', "-")
        .to_lowercase()
}

/// Expand `@` shorthands in `selector` for target `name` using attribute
/// prefix `prefix` (`<prefix>-target`).
pub fn targetize_selector(name: &str, selector: &str, prefix: &str) -> String {
    if selector == "@" {
        format!("*[{}-target='{}']", prefix, kebab_case(name))
    } else {
        TARGET_TOKEN_RE
            .replace_all(selector, |caps: &regex::Captures| {
                format!("[{}-target='{}']", prefix, &caps[1])
            })
            .into_owned()
    }
}

/// A named accessor installed by a [`TargetResolver`].
#[derive(Debug, Clone)]
pub struct TargetAccessor {
    name: String,
    selector: Selector,
    multi: bool,
}

impl TargetAccessor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The selector after `@` expansion.
    pub fn selector(&self) -> &str {
        self.selector.as_str()
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }
}

pub struct TargetResolver {
    document: Rc<Document>,
    element: NodeRef,
    tag_name: String,
    shadow: bool,
    accessors: Vec<TargetAccessor>,
}

impl TargetResolver {
    /// Build accessors for every declared target. Fails only if a selector
    /// does not parse.
    pub fn new<I, N>(host: &Host, targets: I, options: ControllerOptions) -> Result<Self>
    where
        I: IntoIterator<Item = (N, TargetSpec)>,
        N: Into<String>,
    {
        let prefix = if options.shadow {
            SHADOW_TARGET_PREFIX
        } else {
            host.tag_name()
        };

        let mut accessors: Vec<TargetAccessor> = Vec::new();
        for (name, spec) in targets {
            let name = name.into();
            let selector = Selector::parse(&targetize_selector(&name, spec.selector(), prefix))?;
            let accessor = TargetAccessor {
                name,
                selector,
                multi: spec.is_multi(),
            };
            match accessors.iter_mut().find(|a| a.name == accessor.name) {
                Some(existing) => *existing = accessor,
                None => accessors.push(accessor),
            }
        }

        Ok(Self {
            document: host.document().clone(),
            element: host.element().clone(),
            tag_name: host.tag_name().to_string(),
            shadow: options.shadow,
            accessors,
        })
    }

    /// Build from a JSON object such as `{"items": ["@"], "title": "h1"}`.
    pub fn from_json(host: &Host, json: &str, options: ControllerOptions) -> Result<Self> {
        let targets: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut specs = Vec::with_capacity(targets.len());
        for (name, value) in targets {
            specs.push((name, serde_json::from_value::<TargetSpec>(value)?));
        }
        Self::new(host, specs, options)
    }

    pub fn accessors(&self) -> &[TargetAccessor] {
        &self.accessors
    }

    pub fn accessor(&self, name: &str) -> Option<&TargetAccessor> {
        self.accessors.iter().find(|a| a.name == name)
    }

    /// Read a target by name. `None` if no such target was declared.
    pub fn resolve(&self, name: &str) -> Option<TargetValue> {
        let accessor = self.accessor(name)?;
        let Some(root) = self.effective_root() else {
            return Some(if accessor.multi {
                TargetValue::Many(vec![])
            } else {
                TargetValue::One(None)
            });
        };
        let scope = (!self.shadow).then(|| TreeScope::new(&root, &self.tag_name));
        let in_scope = |node: &NodeRef| scope.as_ref().map_or(true, |s| s.belongs_to(node));

        Some(if accessor.multi {
            TargetValue::Many(
                root.query_selector_all(&accessor.selector)
                    .into_iter()
                    .filter(|node| in_scope(node))
                    .collect(),
            )
        } else {
            // Only the first match is considered.
            TargetValue::One(
                root.query_selector(&accessor.selector)
                    .filter(|node| in_scope(node)),
            )
        })
    }

    /// Single-element read. For a multi target, the first element.
    pub fn target(&self, name: &str) -> Option<NodeRef> {
        match self.resolve(name)? {
            TargetValue::One(node) => node,
            TargetValue::Many(nodes) => nodes.into_iter().next(),
        }
    }

    /// Multi-element read. For a single target, zero or one element.
    pub fn targets(&self, name: &str) -> Vec<NodeRef> {
        match self.resolve(name) {
            Some(TargetValue::Many(nodes)) => nodes,
            Some(TargetValue::One(node)) => node.into_iter().collect(),
            None => vec![],
        }
    }

    fn effective_root(&self) -> Option<NodeRef> {
        if self.shadow {
            self.document.shadow_root(&self.element)
        } else {
            Some(self.element.clone())
        }
    }
}
