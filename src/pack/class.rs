//! The structural surface of a loaded class and of its instances.
//!
//! Loading never asks a class what it *is*, only what it *has*: base names,
//! entry points, a `name` attribute, declarative field defaults. Native Rust
//! packs and script packs described by manifests both expose this surface.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PackConfig;
use crate::error::InvokeError;
use crate::llm::LanguageModel;

/// Reply returned by [`InitContext::call_llm`] when no model was supplied.
pub const NO_LLM_REPLY: &str = "No LLM available, cannot proceed";

/// Conventional invocation methods a pack may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Run,
    PrivateRun,
    AsyncRun,
    PrivateAsyncRun,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 4] = [
        EntryPoint::Run,
        EntryPoint::PrivateRun,
        EntryPoint::AsyncRun,
        EntryPoint::PrivateAsyncRun,
    ];

    pub fn method_name(&self) -> &'static str {
        match self {
            EntryPoint::Run => "run",
            EntryPoint::PrivateRun => "_run",
            EntryPoint::AsyncRun => "arun",
            EntryPoint::PrivateAsyncRun => "_arun",
        }
    }

    pub fn from_method_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.method_name() == name)
    }

    pub fn is_async(&self) -> bool {
        matches!(self, EntryPoint::AsyncRun | EntryPoint::PrivateAsyncRun)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

type ComputedName = dyn Fn() -> Option<String> + Send + Sync;

/// A class-level `name` attribute: either a literal or computed on demand.
#[derive(Clone)]
pub enum NameAttribute {
    Value(String),
    Computed(Arc<ComputedName>),
}

impl NameAttribute {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        NameAttribute::Computed(Arc::new(f))
    }

    /// The current value; `None` when a computed name cannot be produced.
    pub fn resolve(&self) -> Option<String> {
        match self {
            NameAttribute::Value(name) => Some(name.clone()),
            NameAttribute::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for NameAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameAttribute::Value(name) => f.debug_tuple("Value").field(name).finish(),
            NameAttribute::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Everything a pack receives when it is constructed.
#[derive(Clone)]
pub struct InitContext {
    pub init_args: Map<String, Value>,
    pub workspace_path: PathBuf,
    pub restrict_code_execution: bool,
    pub llm: Option<Arc<dyn LanguageModel>>,
}

impl InitContext {
    pub fn new(config: &PackConfig) -> Self {
        Self {
            init_args: Map::new(),
            workspace_path: config.workspace_path.clone(),
            restrict_code_execution: config.restrict_code_execution,
            llm: None,
        }
    }

    pub fn with_init_args(mut self, init_args: Map<String, Value>) -> Self {
        self.init_args = init_args;
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Ask the supplied model, or answer [`NO_LLM_REPLY`] when there is none.
    pub async fn call_llm(&self, prompt: &str) -> anyhow::Result<String> {
        match &self.llm {
            Some(llm) => llm.complete(prompt).await,
            None => Ok(NO_LLM_REPLY.to_string()),
        }
    }
}

impl Default for InitContext {
    fn default() -> Self {
        Self::new(&PackConfig::default())
    }
}

impl fmt::Debug for InitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitContext")
            .field("init_args", &self.init_args)
            .field("workspace_path", &self.workspace_path)
            .field("restrict_code_execution", &self.restrict_code_execution)
            .field("llm", &self.llm.is_some())
            .finish()
    }
}

/// A class exported by a module, seen through its structural surface.
pub trait PackClass: Send + Sync + fmt::Debug {
    fn class_name(&self) -> &str;

    /// Dotted path of the module that defines the class.
    fn module_path(&self) -> &str;

    fn qualified_name(&self) -> String {
        format!("{}.{}", self.module_path(), self.class_name())
    }

    /// Names of the classes this one derives from.
    fn bases(&self) -> &[String];

    /// Invocation methods the class defines.
    fn entry_points(&self) -> Vec<EntryPoint>;

    fn has_entry_point(&self, entry: EntryPoint) -> bool {
        self.entry_points().contains(&entry)
    }

    fn name_attribute(&self) -> Option<NameAttribute>;

    /// Default value of a declarative field, if the class declares one.
    fn field_default(&self, field: &str) -> Option<Value>;

    fn instantiate(&self, ctx: InitContext) -> Result<Arc<dyn PackInstance>, InvokeError>;
}

/// A constructed pack.
#[async_trait]
pub trait PackInstance: Send + Sync {
    fn call(&self, entry: EntryPoint, args: &Map<String, Value>) -> Result<String, InvokeError>;

    async fn acall(
        &self,
        entry: EntryPoint,
        _args: &Map<String, Value>,
    ) -> Result<String, InvokeError> {
        Err(InvokeError::NotInvocable(format!(
            "no async implementation of {}",
            entry
        )))
    }
}
