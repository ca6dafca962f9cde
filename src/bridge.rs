//! Node bindings for the pure helpers, so build tooling can share the exact
//! action and target syntax.

use napi_derive::napi;

use crate::actions::{default_event_for, parse_action_declarations};
use crate::targets::{kebab_case, targetize_selector};

#[napi(object)]
pub struct ActionDeclarationExport {
    pub event: String,
    pub action: String,
}

#[napi]
pub fn kebab_case_native(name: String) -> String {
    kebab_case(&name)
}

#[napi]
pub fn targetize_selector_native(name: String, selector: String, prefix: String) -> String {
    targetize_selector(&name, &selector, &prefix)
}

#[napi]
pub fn parse_action_declarations_native(
    value: String,
    tag_name: String,
    type_attr: Option<String>,
) -> Vec<ActionDeclarationExport> {
    let default_event = default_event_for(&tag_name, type_attr.as_deref());
    parse_action_declarations(&value, default_event)
        .into_iter()
        .map(|declaration| ActionDeclarationExport {
            event: declaration.event,
            action: declaration.action,
        })
        .collect()
}
