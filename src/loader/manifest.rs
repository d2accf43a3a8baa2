//! Manifest modules: JSON documents on the import path describing script packs.
//!
//! ```json
//! {
//!   "requires": ["python3"],
//!   "members": [
//!     {
//!       "kind": "class",
//!       "name": "WebSearch",
//!       "bases": ["Pack"],
//!       "attributes": {"name": "web_search"},
//!       "fields": {"description": "Search the web"},
//!       "methods": {"run": {"program": "python3", "args": ["search.py"]}}
//!     },
//!     {"kind": "value", "name": "VERSION", "value": "1.2"}
//!   ]
//! }
//! ```
//!
//! A `name` attribute may also be `{"call": {"program": ..., "args": [...]}}`,
//! computed by running the command.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::module::{Member, Module};
use crate::pack::{NameAttribute, ScriptClass, ScriptMethod};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleManifest {
    /// Executables that must be on `PATH` for the module to import.
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub members: Vec<MemberManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MemberManifest {
    Class(ClassManifest),
    Function { name: String },
    Value { name: String, value: Value },
}

#[derive(Debug, Deserialize)]
pub struct ClassManifest {
    pub name: String,
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeManifest>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub methods: BTreeMap<String, ScriptMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AttributeManifest {
    Call { call: ScriptMethod },
    Literal(Value),
}

impl ModuleManifest {
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Build the module; script methods run from `module_dir`.
    pub fn into_module(self, module_path: &str, module_dir: &Path) -> Module {
        self.members
            .into_iter()
            .fold(Module::new(module_path), |module, member| match member {
                MemberManifest::Class(class) => {
                    let name = class.name.clone();
                    let class = class.into_class(module_path, module_dir);
                    module.with_member(name, Member::Class(Arc::new(class)))
                }
                MemberManifest::Function { name } => module.with_member(name, Member::Function),
                MemberManifest::Value { name, value } => {
                    module.with_member(name, Member::Value(value))
                }
            })
    }
}

impl ClassManifest {
    fn into_class(self, module_path: &str, module_dir: &Path) -> ScriptClass {
        let mut class = ScriptClass::new(module_path, self.name, module_dir)
            .with_bases(self.bases)
            .with_fields(self.fields);

        match self.attributes.into_iter().find(|(key, _)| key == "name") {
            Some((_, AttributeManifest::Call { call })) => {
                class = class.with_computed_name(call);
            }
            Some((_, AttributeManifest::Literal(Value::String(name)))) => {
                class = class.with_name(NameAttribute::Value(name));
            }
            _ => {}
        }

        self.methods
            .into_iter()
            .fold(class, |class, (name, method)| class.with_method(name, method))
    }
}
