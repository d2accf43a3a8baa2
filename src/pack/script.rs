//! Packs whose methods are external commands, declared by manifest modules.
//!
//! A method call runs its program with the module directory as working
//! directory, the keyword arguments as a JSON object on stdin, and the
//! constructor context in `AUTOPACK_*` environment variables. The trimmed
//! stdout is the result; a non-zero exit fails with stderr.

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use super::class::{EntryPoint, InitContext, NameAttribute, PackClass, PackInstance};
use crate::error::InvokeError;

/// A command bound to a class method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptMethod {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ScriptMethod {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Relative programs containing a separator are taken from the module directory.
    fn resolve_program(&self, module_dir: &Path) -> PathBuf {
        let program = Path::new(&self.program);
        if program.is_relative() && program.components().count() > 1 {
            module_dir.join(program)
        } else {
            program.to_path_buf()
        }
    }

    fn command(&self, module_dir: &Path) -> Command {
        let mut command = Command::new(self.resolve_program(module_dir));
        command.args(&self.args).current_dir(module_dir);
        command
    }
}

#[derive(Debug, Clone)]
pub struct ScriptClass {
    module_path: String,
    class_name: String,
    module_dir: PathBuf,
    bases: Vec<String>,
    name: Option<NameAttribute>,
    fields: BTreeMap<String, Value>,
    methods: BTreeMap<String, ScriptMethod>,
}

impl ScriptClass {
    pub fn new(
        module_path: impl Into<String>,
        class_name: impl Into<String>,
        module_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            module_path: module_path.into(),
            class_name: class_name.into(),
            module_dir: module_dir.into(),
            bases: Vec::new(),
            name: None,
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
        }
    }

    pub fn with_bases(mut self, bases: Vec<String>) -> Self {
        self.bases = bases;
        self
    }

    pub fn with_name(mut self, name: NameAttribute) -> Self {
        self.name = Some(name);
        self
    }

    /// A `name` attribute produced by running `method` whenever it is read.
    pub fn with_computed_name(self, method: ScriptMethod) -> Self {
        let dir = self.module_dir.clone();
        self.with_name(NameAttribute::computed(move || run_name_command(&method, &dir)))
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, Value>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_method(mut self, name: impl Into<String>, method: ScriptMethod) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }
}

fn run_name_command(method: &ScriptMethod, dir: &Path) -> Option<String> {
    match method.command(dir).stdin(Stdio::null()).output() {
        Ok(output) if output.status.success() => {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!name.is_empty()).then_some(name)
        }
        Ok(output) => {
            debug!("Name command {} exited with {}", method.program, output.status);
            None
        }
        Err(e) => {
            debug!("Name command {} could not run: {}", method.program, e);
            None
        }
    }
}

impl PackClass for ScriptClass {
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
        self.methods
            .keys()
            .filter_map(|name| EntryPoint::from_method_name(name))
            .collect()
    }

    fn name_attribute(&self) -> Option<NameAttribute> {
        self.name.clone()
    }

    fn field_default(&self, field: &str) -> Option<Value> {
        self.fields.get(field).cloned()
    }

    fn instantiate(&self, ctx: InitContext) -> Result<Arc<dyn PackInstance>, InvokeError> {
        let init_args = serde_json::to_string(&ctx.init_args).map_err(|e| {
            InvokeError::Construction {
                class: self.qualified_name(),
                reason: e.to_string(),
            }
        })?;
        if ctx.llm.is_some() {
            warn!(
                "{} runs as an external command and cannot use the supplied language model",
                self.qualified_name()
            );
        }

        Ok(Arc::new(ScriptInstance {
            module_dir: self.module_dir.clone(),
            methods: self.methods.clone(),
            env: vec![
                ("AUTOPACK_INIT_ARGS", init_args),
                (
                    "AUTOPACK_WORKSPACE_PATH",
                    ctx.workspace_path.to_string_lossy().into_owned(),
                ),
                (
                    "AUTOPACK_RESTRICT_CODE_EXECUTION",
                    ctx.restrict_code_execution.to_string(),
                ),
            ],
        }))
    }
}

struct ScriptInstance {
    module_dir: PathBuf,
    methods: BTreeMap<String, ScriptMethod>,
    env: Vec<(&'static str, String)>,
}

impl ScriptInstance {
    fn method(&self, entry: EntryPoint) -> Result<&ScriptMethod, InvokeError> {
        self.methods
            .get(entry.method_name())
            .ok_or_else(|| InvokeError::NotInvocable(format!("no method {}", entry)))
    }

    fn command(&self, method: &ScriptMethod) -> Command {
        let mut command = method.command(&self.module_dir);
        command
            .envs(self.env.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

fn encode_args(args: &Map<String, Value>) -> Result<Vec<u8>, InvokeError> {
    serde_json::to_vec(args).map_err(|e| InvokeError::ExecutionFailed(e.to_string()))
}

/// Stdin is written while output is drained, and closed once written. A
/// child that exits without reading all of it is not an error.
fn write_payload(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn collect_output(output: Output) -> Result<String, InvokeError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(InvokeError::ExecutionFailed(detail));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[async_trait]
impl PackInstance for ScriptInstance {
    fn call(&self, entry: EntryPoint, args: &Map<String, Value>) -> Result<String, InvokeError> {
        let method = self.method(entry)?;
        let payload = encode_args(args)?;
        debug!("Running {} {:?}", method.program, method.args);

        let mut child = self.command(method).spawn()?;
        let writer = child
            .stdin
            .take()
            .map(|mut stdin| std::thread::spawn(move || write_payload(stdin.write_all(&payload))));
        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| InvokeError::ExecutionFailed("stdin writer panicked".to_string()))??;
        }
        collect_output(output)
    }

    async fn acall(
        &self,
        entry: EntryPoint,
        args: &Map<String, Value>,
    ) -> Result<String, InvokeError> {
        let method = self.method(entry)?;
        let payload = encode_args(args)?;
        debug!("Running {} {:?} asynchronously", method.program, method.args);

        let mut child = tokio::process::Command::from(self.command(method)).spawn()?;
        let stdin = child.stdin.take();
        let write = async move {
            match stdin {
                Some(mut stdin) => write_payload(stdin.write_all(&payload).await),
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;
        written?;
        collect_output(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn write_script(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_call_passes_args_on_stdin() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "echo.sh", "cat");
        let class = ScriptClass::new("tools.echo", "Echo", dir.path())
            .with_method("run", ScriptMethod::new("./echo.sh"));

        assert_eq!(class.entry_points(), vec![EntryPoint::Run]);
        let instance = class.instantiate(InitContext::default()).unwrap();
        let out = instance
            .call(EntryPoint::Run, &args(json!({"text": "hi"})))
            .unwrap();
        assert_eq!(out, r#"{"text":"hi"}"#);
    }

    #[test]
    fn test_call_exposes_context_env() {
        let dir = tempdir().unwrap();
        write_script(
            dir.path(),
            "env.sh",
            "echo \"$AUTOPACK_RESTRICT_CODE_EXECUTION $AUTOPACK_INIT_ARGS\"",
        );
        let class = ScriptClass::new("tools.env", "Env", dir.path())
            .with_method("_run", ScriptMethod::new("./env.sh"));
        let ctx = InitContext {
            restrict_code_execution: true,
            ..InitContext::default()
        }
        .with_init_args(args(json!({"model": "small"})));

        let instance = class.instantiate(ctx).unwrap();
        let out = instance.call(EntryPoint::PrivateRun, &Map::new()).unwrap();
        assert_eq!(out, r#"true {"model":"small"}"#);
    }

    #[test]
    fn test_failure_reports_stderr() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "fail.sh", "echo boom >&2; exit 3");
        let class = ScriptClass::new("tools.fail", "Fail", dir.path())
            .with_method("run", ScriptMethod::new("./fail.sh"));
        let instance = class.instantiate(InitContext::default()).unwrap();

        match instance.call(EntryPoint::Run, &Map::new()) {
            Err(InvokeError::ExecutionFailed(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_method_is_not_invocable() {
        let dir = tempdir().unwrap();
        let class = ScriptClass::new("tools.none", "None", dir.path());
        let instance = class.instantiate(InitContext::default()).unwrap();
        assert!(matches!(
            instance.call(EntryPoint::Run, &Map::new()),
            Err(InvokeError::NotInvocable(_))
        ));
    }

    /// Larger than any pipe buffer, so the child blocks on stdout until it is drained.
    fn large_text() -> String {
        "x".repeat(512 * 1024)
    }

    #[test]
    fn test_call_streams_large_args() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "echo.sh", "cat");
        let class = ScriptClass::new("tools.echo", "Echo", dir.path())
            .with_method("run", ScriptMethod::new("./echo.sh"));
        let instance = class.instantiate(InitContext::default()).unwrap();
        let text = large_text();
        let expected = serde_json::to_string(&json!({"text": text})).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(instance.call(EntryPoint::Run, &args(json!({"text": text}))));
        });
        let out = rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("call did not return")
            .unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_call_tolerates_unread_stdin() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "ignore.sh", "echo done");
        let class = ScriptClass::new("tools.ignore", "Ignore", dir.path())
            .with_method("run", ScriptMethod::new("./ignore.sh"));
        let instance = class.instantiate(InitContext::default()).unwrap();

        let out = instance
            .call(EntryPoint::Run, &args(json!({"text": large_text()})))
            .unwrap();
        assert_eq!(out, "done");
    }

    #[tokio::test]
    async fn test_acall_runs_command() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "upper.sh", "tr a-z A-Z");
        let class = ScriptClass::new("tools.upper", "Upper", dir.path())
            .with_method("arun", ScriptMethod::new("./upper.sh"));
        let instance = class.instantiate(InitContext::default()).unwrap();

        let out = instance
            .acall(EntryPoint::AsyncRun, &args(json!({"a": "b"})))
            .await
            .unwrap();
        assert_eq!(out, r#"{"A":"B"}"#);

        let text = large_text();
        let out = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            instance.acall(EntryPoint::AsyncRun, &args(json!({"text": text}))),
        )
        .await
        .expect("acall did not return")
        .unwrap();
        assert_eq!(out.len(), text.len() + r#"{"TEXT":""}"#.len());
        assert!(out.starts_with(r#"{"TEXT":"XXXX"#));
    }

    #[test]
    fn test_computed_name() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "name.sh", "echo web_search");
        let class = ScriptClass::new("tools.web", "Search", dir.path())
            .with_computed_name(ScriptMethod::new("./name.sh"));
        assert_eq!(
            class.name_attribute().and_then(|n| n.resolve()),
            Some("web_search".to_string())
        );

        let broken = ScriptClass::new("tools.web", "Search", dir.path())
            .with_computed_name(ScriptMethod::new("./missing.sh"));
        assert_eq!(broken.name_attribute().and_then(|n| n.resolve()), None);
    }
}
