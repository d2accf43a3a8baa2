use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::pack::PackClass;

/// One named export of a module.
#[derive(Debug, Clone)]
pub enum Member {
    Class(Arc<dyn PackClass>),
    Function,
    Value(Value),
}

impl Member {
    pub fn as_class(&self) -> Option<&Arc<dyn PackClass>> {
        match self {
            Member::Class(class) => Some(class),
            _ => None,
        }
    }
}

/// An imported module: its dotted path and its members in declaration order.
#[derive(Debug, Clone)]
pub struct Module {
    path: String,
    members: Vec<(String, Member)>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, name: impl Into<String>, member: Member) -> Self {
        self.members.push((name.into(), member));
        self
    }

    /// Export a class under its own class name.
    pub fn with_class(self, class: Arc<dyn PackClass>) -> Self {
        let name = class.class_name().to_string();
        self.with_member(name, Member::Class(class))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn members(&self) -> &[(String, Member)] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|(member_name, _)| member_name == name)
            .map(|(_, member)| member)
    }
}

/// Modules compiled into the host program, consulted before the import path.
#[derive(Debug, Default, Clone)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Module) {
        self.modules
            .insert(module.path().to_string(), Arc::new(module));
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.register(module);
        self
    }

    pub fn get(&self, path: &str) -> Option<Arc<Module>> {
        self.modules.get(path).cloned()
    }
}
