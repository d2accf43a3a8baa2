//! Packs implemented in Rust and registered in-process.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::class::{EntryPoint, InitContext, NameAttribute, PackClass, PackInstance};
use crate::error::InvokeError;

type Factory = dyn Fn(InitContext) -> Result<Arc<dyn PackInstance>, InvokeError> + Send + Sync;
type RunFn = dyn Fn(&Map<String, Value>) -> Result<String, InvokeError> + Send + Sync;

/// A class whose surface is declared with a builder and whose instances come from a factory.
///
/// ```ignore
/// let class = NativeClass::new("tools.files", "ReadFile")
///     .base("Pack")
///     .name("read_file")
///     .run_with(|args| Ok(std::fs::read_to_string(args["path"].as_str().unwrap_or_default())?));
/// ```
#[derive(Clone)]
pub struct NativeClass {
    module_path: String,
    class_name: String,
    bases: Vec<String>,
    entry_points: Vec<EntryPoint>,
    name: Option<NameAttribute>,
    fields: BTreeMap<String, Value>,
    factory: Option<Arc<Factory>>,
}

impl NativeClass {
    pub fn new(module_path: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            class_name: class_name.into(),
            bases: Vec::new(),
            entry_points: Vec::new(),
            name: None,
            fields: BTreeMap::new(),
            factory: None,
        }
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    pub fn entry_point(mut self, entry: EntryPoint) -> Self {
        if !self.entry_points.contains(&entry) {
            self.entry_points.push(entry);
        }
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(NameAttribute::Value(name.into()));
        self
    }

    pub fn computed_name<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.name = Some(NameAttribute::computed(f));
        self
    }

    /// Declare a field with a default value, e.g. `name`.
    pub fn field(mut self, field: impl Into<String>, default: Value) -> Self {
        self.fields.insert(field.into(), default);
        self
    }

    pub fn factory<F>(mut self, f: F) -> Self
    where
        F: Fn(InitContext) -> Result<Arc<dyn PackInstance>, InvokeError> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(f));
        self
    }

    /// Shorthand for a pack with a synchronous `run` backed by a closure.
    pub fn run_with<F>(self, f: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<String, InvokeError> + Send + Sync + 'static,
    {
        let run: Arc<RunFn> = Arc::new(f);
        self.entry_point(EntryPoint::Run).factory(move |_ctx| {
            Ok(Arc::new(FnInstance {
                entry: EntryPoint::Run,
                run: Arc::clone(&run),
            }) as Arc<dyn PackInstance>)
        })
    }

    /// Shorthand for a pack with a private `_run`, the common third-party tool shape.
    pub fn private_run_with<F>(self, f: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<String, InvokeError> + Send + Sync + 'static,
    {
        let run: Arc<RunFn> = Arc::new(f);
        self.entry_point(EntryPoint::PrivateRun).factory(move |_ctx| {
            Ok(Arc::new(FnInstance {
                entry: EntryPoint::PrivateRun,
                run: Arc::clone(&run),
            }) as Arc<dyn PackInstance>)
        })
    }
}

impl fmt::Debug for NativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeClass")
            .field("module_path", &self.module_path)
            .field("class_name", &self.class_name)
            .field("bases", &self.bases)
            .field("entry_points", &self.entry_points)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PackClass for NativeClass {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn module_path(&self) -> &str {
        &self.module_path
    }

    fn bases(&self) -> &[String] {
        &self.bases
    }

    fn entry_points(&self) -> Vec<EntryPoint> {
        self.entry_points.clone()
    }

    fn name_attribute(&self) -> Option<NameAttribute> {
        self.name.clone()
    }

    fn field_default(&self, field: &str) -> Option<Value> {
        self.fields.get(field).cloned()
    }

    fn instantiate(&self, ctx: InitContext) -> Result<Arc<dyn PackInstance>, InvokeError> {
        match &self.factory {
            Some(factory) => factory(ctx),
            None => Err(InvokeError::Construction {
                class: self.qualified_name(),
                reason: "no constructor registered".to_string(),
            }),
        }
    }
}

struct FnInstance {
    entry: EntryPoint,
    run: Arc<RunFn>,
}

impl PackInstance for FnInstance {
    fn call(&self, entry: EntryPoint, args: &Map<String, Value>) -> Result<String, InvokeError> {
        if entry != self.entry {
            return Err(InvokeError::NotInvocable(format!("no method {}", entry)));
        }
        (self.run)(args)
    }
}
