//! Structural tests deciding whether a module member is the pack being loaded.

use serde_json::Value;
use std::sync::Arc;

use super::module::{Member, Module};
use crate::pack::{EntryPoint, PackClass};

/// Base class names of the third-party tool shapes accepted without a run method.
pub const TOOL_BASE_NAMES: [&str; 4] = ["BaseTool", "StructuredTool", "Tool", "Pack"];

pub fn has_run_method(class: &dyn PackClass) -> bool {
    EntryPoint::ALL.iter().any(|e| class.has_entry_point(*e))
}

pub fn has_tool_base(class: &dyn PackClass) -> bool {
    class
        .bases()
        .iter()
        .any(|base| TOOL_BASE_NAMES.contains(&base.as_str()))
}

pub fn is_invocable(class: &dyn PackClass) -> bool {
    has_run_method(class) || has_tool_base(class)
}

/// Lowercase with spaces replaced by underscores: `"Web Search"` -> `"web_search"`.
pub fn snake_case(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Ways a class can declare the name it is looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    /// The class is named exactly like the target.
    ClassName,
    /// A class-level `name` attribute, possibly computed, equals the target.
    NameAttribute,
    /// A declarative `name` field whose default, snake-cased, equals the target.
    DeclarativeField,
}

impl NameMatch {
    /// Tried in this order across the whole module.
    pub const PRIORITY: [NameMatch; 3] = [
        NameMatch::ClassName,
        NameMatch::NameAttribute,
        NameMatch::DeclarativeField,
    ];

    pub fn matches(&self, class: &dyn PackClass, target: &str) -> bool {
        match self {
            NameMatch::ClassName => class.class_name() == target,
            NameMatch::NameAttribute => class
                .name_attribute()
                .and_then(|attr| attr.resolve())
                .is_some_and(|name| name == target),
            NameMatch::DeclarativeField => match class.field_default("name") {
                Some(Value::String(default)) if !default.is_empty() => {
                    snake_case(&default) == target
                }
                _ => false,
            },
        }
    }
}

/// The first invocable class in `module` whose name matches `target`.
///
/// Every member is tried against one [`NameMatch`] rule before the next rule
/// is tried, so an exact class name anywhere beats a name attribute earlier
/// in the module.
pub fn find_pack_class(module: &Module, target: &str) -> Option<(Arc<dyn PackClass>, NameMatch)> {
    let mut candidates = Vec::new();
    for (_, member) in module.members() {
        if let Member::Class(class) = member
            && is_invocable(&**class)
        {
            candidates.push(class);
        }
    }

    for rule in NameMatch::PRIORITY {
        for class in &candidates {
            if rule.matches(&***class, target) {
                return Some((Arc::clone(class), rule));
            }
        }
    }
    None
}

/// The member named `class_name`, if it is an invocable class.
pub fn explicit_pack_class(module: &Module, class_name: &str) -> Option<Arc<dyn PackClass>> {
    match module.member(class_name)? {
        Member::Class(class) if is_invocable(&**class) => Some(Arc::clone(class)),
        _ => None,
    }
}
