//! One calling convention over every pack shape.

use log::debug;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::args::{parameters_schema, validate_args};
use super::class::{EntryPoint, PackClass, PackInstance};
use crate::error::InvokeError;
use crate::package::PackMetadata;

const SYNC_ORDER: [EntryPoint; 2] = [EntryPoint::Run, EntryPoint::PrivateRun];
const ASYNC_ORDER: [EntryPoint; 2] = [EntryPoint::AsyncRun, EntryPoint::PrivateAsyncRun];

/// A constructed pack together with the record that describes it.
///
/// Invalid arguments are not an error here: `run` and `arun` return the
/// validation message as their result so agents always get text back.
#[derive(Clone)]
pub struct PackWrapper {
    metadata: Arc<PackMetadata>,
    class: Arc<dyn PackClass>,
    instance: Arc<dyn PackInstance>,
}

impl std::fmt::Debug for PackWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackWrapper")
            .field("pack_id", &self.metadata.pack_id)
            .field("class", &self.class.qualified_name())
            .finish_non_exhaustive()
    }
}

impl PackWrapper {
    pub fn new(
        metadata: Arc<PackMetadata>,
        class: Arc<dyn PackClass>,
        instance: Arc<dyn PackInstance>,
    ) -> Self {
        Self {
            metadata,
            class,
            instance,
        }
    }

    pub fn metadata(&self) -> &PackMetadata {
        &self.metadata
    }

    pub fn pack_id(&self) -> &str {
        &self.metadata.pack_id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    pub fn class(&self) -> &Arc<dyn PackClass> {
        &self.class
    }

    /// JSON Schema of the run arguments.
    pub fn parameters_schema(&self) -> Value {
        parameters_schema(&self.metadata.run_args)
    }

    fn first_of(&self, order: &[EntryPoint]) -> Option<EntryPoint> {
        let available = self.class.entry_points();
        order.iter().copied().find(|e| available.contains(e))
    }

    /// Run synchronously through `run`, or `_run` when that is all the class has.
    ///
    /// A class with only `arun`/`_arun` is driven to completion on the
    /// current Tokio runtime when there is a multi-threaded one, otherwise on
    /// a private current-thread runtime.
    #[tracing::instrument(skip(self, args), fields(pack = %self.metadata.pack_id))]
    pub fn run(&self, args: &Map<String, Value>) -> Result<String, InvokeError> {
        if let Err(message) = validate_args(&self.metadata.run_args, args) {
            return Ok(message);
        }
        if let Some(entry) = self.first_of(&SYNC_ORDER) {
            debug!("Calling {}.{}", self.class.qualified_name(), entry);
            return self.instance.call(entry, args);
        }

        let entry = self
            .first_of(&ASYNC_ORDER)
            .ok_or_else(|| InvokeError::NotInvocable(self.class.qualified_name()))?;
        debug!(
            "{} has no sync entry point, blocking on {}",
            self.class.qualified_name(),
            entry
        );
        let instance = self.instance.as_ref();
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(instance.acall(entry, args)))
            }
            // The only worker of a current-thread runtime cannot block on itself.
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(|| block_on_private(instance, entry, args))
                    .join()
                    .map_err(|_| InvokeError::ExecutionFailed(format!("{} panicked", entry)))?
            }),
            Err(_) => block_on_private(instance, entry, args),
        }
    }

    /// Run asynchronously through `arun`/`_arun`, falling back to the sync
    /// entry point on the blocking pool.
    #[tracing::instrument(skip(self, args), fields(pack = %self.metadata.pack_id))]
    pub async fn arun(&self, args: &Map<String, Value>) -> Result<String, InvokeError> {
        if let Err(message) = validate_args(&self.metadata.run_args, args) {
            return Ok(message);
        }

        if let Some(entry) = self.first_of(&ASYNC_ORDER) {
            debug!("Awaiting {}.{}", self.class.qualified_name(), entry);
            return self.instance.acall(entry, args).await;
        }

        let entry = self
            .first_of(&SYNC_ORDER)
            .ok_or_else(|| InvokeError::NotInvocable(self.class.qualified_name()))?;
        debug!(
            "{} has no async entry point, running {} on the blocking pool",
            self.class.qualified_name(),
            entry
        );
        let instance = Arc::clone(&self.instance);
        let args = args.clone();
        tokio::task::spawn_blocking(move || instance.call(entry, &args))
            .await
            .map_err(|e| InvokeError::ExecutionFailed(e.to_string()))?
    }
}

fn block_on_private(
    instance: &dyn PackInstance,
    entry: EntryPoint,
    args: &Map<String, Value>,
) -> Result<String, InvokeError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| InvokeError::ExecutionFailed(e.to_string()))?;
    runtime.block_on(instance.acall(entry, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::class::InitContext;
    use crate::pack::native::NativeClass;
    use crate::package::{ArgSpec, ImportTarget, PackSource};
    use async_trait::async_trait;
    use serde_json::json;

    fn metadata() -> Arc<PackMetadata> {
        let mut meta = PackMetadata::new(
            "autopack/tests/echo",
            "echo",
            PackSource::LocalPackage { path: None },
            ImportTarget::class("tests.echo", "Echo"),
        );
        meta.run_args
            .insert("text".into(), ArgSpec::new("string", "Text to echo", true));
        Arc::new(meta)
    }

    fn wrap(class: NativeClass) -> PackWrapper {
        let instance = class.instantiate(InitContext::default()).unwrap();
        PackWrapper::new(metadata(), Arc::new(class), instance)
    }

    fn echo(args: &Map<String, Value>) -> Result<String, InvokeError> {
        Ok(args["text"].as_str().unwrap_or_default().to_string())
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_run_dispatches_to_run() {
        let pack = wrap(NativeClass::new("tests.echo", "Echo").run_with(echo));
        assert_eq!(pack.run(&args(json!({"text": "hello"}))).unwrap(), "hello");
    }

    #[test]
    fn test_run_falls_back_to_private_run() {
        let pack = wrap(NativeClass::new("tests.echo", "Echo").private_run_with(echo));
        assert_eq!(pack.run(&args(json!({"text": "hi"}))).unwrap(), "hi");
    }

    #[test]
    fn test_invalid_args_return_message() {
        let pack = wrap(NativeClass::new("tests.echo", "Echo").run_with(echo));
        let result = pack.run(&Map::new()).unwrap();
        assert_eq!(
            result,
            "Error: Invalid arguments. Details: text: field required"
        );
    }

    #[test]
    fn test_construction_only_pack_is_not_invocable() {
        let class = NativeClass::new("tests.echo", "Echo").factory(|_| {
            Ok(Arc::new(NoRun) as Arc<dyn PackInstance>)
        });
        let pack = wrap(class);
        assert!(matches!(
            pack.run(&args(json!({"text": "x"}))),
            Err(InvokeError::NotInvocable(_))
        ));
    }

    struct NoRun;

    impl PackInstance for NoRun {
        fn call(&self, entry: EntryPoint, _: &Map<String, Value>) -> Result<String, InvokeError> {
            Err(InvokeError::NotInvocable(entry.to_string()))
        }
    }

    struct AsyncEcho;

    #[async_trait]
    impl PackInstance for AsyncEcho {
        fn call(&self, _: EntryPoint, _: &Map<String, Value>) -> Result<String, InvokeError> {
            Ok("sync".into())
        }

        async fn acall(&self, entry: EntryPoint, _: &Map<String, Value>) -> Result<String, InvokeError> {
            Ok(format!("async via {}", entry))
        }
    }

    #[tokio::test]
    async fn test_arun_prefers_async_entry_point() {
        let class = NativeClass::new("tests.echo", "Echo")
            .entry_point(EntryPoint::PrivateRun)
            .entry_point(EntryPoint::PrivateAsyncRun)
            .factory(|_| Ok(Arc::new(AsyncEcho) as Arc<dyn PackInstance>));
        let pack = wrap(class);
        let text = args(json!({"text": "x"}));

        assert_eq!(pack.arun(&text).await.unwrap(), "async via _arun");
        assert_eq!(pack.run(&text).unwrap(), "sync");
    }

    fn async_only() -> PackWrapper {
        wrap(
            NativeClass::new("tests.echo", "Echo")
                .entry_point(EntryPoint::AsyncRun)
                .factory(|_| Ok(Arc::new(AsyncEcho) as Arc<dyn PackInstance>)),
        )
    }

    #[test]
    fn test_run_blocks_on_async_entry_point() {
        let pack = async_only();
        assert_eq!(pack.run(&args(json!({"text": "x"}))).unwrap(), "async via arun");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_blocks_on_async_entry_point_inside_runtime() {
        let pack = async_only();
        assert_eq!(pack.run(&args(json!({"text": "x"}))).unwrap(), "async via arun");
    }

    #[tokio::test]
    async fn test_run_blocks_on_async_entry_point_inside_current_thread_runtime() {
        let pack = async_only();
        assert_eq!(pack.run(&args(json!({"text": "x"}))).unwrap(), "async via arun");
    }

    #[tokio::test]
    async fn test_arun_falls_back_to_sync() {
        let pack = wrap(NativeClass::new("tests.echo", "Echo").run_with(echo));
        assert_eq!(pack.arun(&args(json!({"text": "later"}))).await.unwrap(), "later");
    }

    #[tokio::test]
    async fn test_arun_invalid_args_return_message() {
        let pack = wrap(NativeClass::new("tests.echo", "Echo").run_with(echo));
        let result = pack.arun(&args(json!({"text": 5}))).await.unwrap();
        assert!(result.starts_with("Error: Invalid arguments."));
    }

    #[test]
    fn test_parameters_schema_uses_run_args() {
        let pack = wrap(NativeClass::new("tests.echo", "Echo").run_with(echo));
        assert_eq!(pack.parameters_schema()["required"], json!(["text"]));
    }
}
