//! Pack resolution: import a pack's module and pick out its class.
//!
//! # Structure
//!
//! - `import_path` - the search path and its scoped extension
//! - `module` - imported modules, their members, and in-process modules
//! - `manifest` - JSON manifest modules describing script packs
//! - `validate` - structural pack-likeness checks and name matching

mod import_path;
mod manifest;
mod module;
mod validate;

pub use import_path::{ImportPath, ImportScope};
pub use manifest::ModuleManifest;
pub use module::{Member, Module, ModuleRegistry};
pub use validate::{
    NameMatch, TOOL_BASE_NAMES, find_pack_class, has_run_method, has_tool_base, is_invocable,
    snake_case,
};

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::error::{InvokeError, PackError};
use crate::pack::{InitContext, PackClass, PackWrapper};
use crate::package::{PackMetadata, source_dir};
use crate::runtime::Runtime;

const MANIFEST_EXTENSION: &str = "json";
const PACKAGE_MANIFEST: &str = "mod.json";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    #[error("Invalid module {module}: {reason}")]
    Invalid { module: String, reason: String },

    #[error("Module {module} requires '{executable}', which was not found on PATH")]
    MissingRequirement { module: String, executable: String },

    #[error("Failed to read module {module}: {reason}")]
    Io { module: String, reason: String },
}

/// A pack's metadata together with the class it resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedPack {
    pub metadata: Arc<PackMetadata>,
    pub class: Arc<dyn PackClass>,
}

impl ResolvedPack {
    pub fn qualified_name(&self) -> String {
        self.class.qualified_name()
    }

    /// Construct the pack and wrap it for invocation.
    pub fn instantiate(&self, ctx: InitContext) -> Result<PackWrapper, InvokeError> {
        let instance = self.class.instantiate(ctx)?;
        Ok(PackWrapper::new(
            Arc::clone(&self.metadata),
            Arc::clone(&self.class),
            instance,
        ))
    }
}

/// Imports modules from in-process registrations or from manifests on the import path.
pub struct Loader<'a, R: Runtime> {
    runtime: &'a R,
    import_path: &'a ImportPath,
    modules: &'a ModuleRegistry,
}

impl<'a, R: Runtime> Loader<'a, R> {
    pub fn new(runtime: &'a R, import_path: &'a ImportPath, modules: &'a ModuleRegistry) -> Self {
        Self {
            runtime,
            import_path,
            modules,
        }
    }

    /// Import `module_path`, searching `search` in order. The first file found wins.
    #[tracing::instrument(skip(self, search))]
    pub fn import(&self, module_path: &str, search: &[PathBuf]) -> Result<Arc<Module>, ImportError> {
        if let Some(module) = self.modules.get(module_path) {
            debug!("Using registered module {}", module_path);
            return Ok(module);
        }

        let relative = module_relative_path(module_path)
            .ok_or_else(|| ImportError::ModuleNotFound(module_path.to_string()))?;

        for dir in search {
            let base = dir.join(&relative);
            let file = base.with_extension(MANIFEST_EXTENSION);
            if self.runtime.is_file(&file) {
                return self.load_manifest(module_path, &file);
            }
            let package = base.join(PACKAGE_MANIFEST);
            if self.runtime.is_file(&package) {
                return self.load_manifest(module_path, &package);
            }
        }

        Err(ImportError::ModuleNotFound(module_path.to_string()))
    }

    fn load_manifest(&self, module_path: &str, file: &Path) -> Result<Arc<Module>, ImportError> {
        debug!("Importing {} from {:?}", module_path, file);
        let content = self
            .runtime
            .read_to_string(file)
            .map_err(|e| ImportError::Io {
                module: module_path.to_string(),
                reason: format!("{:#}", e),
            })?;
        let manifest = ModuleManifest::parse(&content).map_err(|e| ImportError::Invalid {
            module: module_path.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(missing) = manifest
            .requires
            .iter()
            .find(|exe| self.runtime.find_executable(exe).is_none())
        {
            return Err(ImportError::MissingRequirement {
                module: module_path.to_string(),
                executable: missing.clone(),
            });
        }

        let module_dir = file.parent().unwrap_or_else(|| Path::new("."));
        Ok(Arc::new(manifest.into_module(module_path, module_dir)))
    }

    /// Import a pack's module with its source and marker directories on the path.
    ///
    /// The import path is back to its previous state when this returns.
    fn import_pack_module(
        &self,
        metadata: &PackMetadata,
        pack_dir: &Path,
    ) -> Result<Arc<Module>, PackError> {
        let extra = vec![source_dir(metadata, pack_dir), pack_dir.to_path_buf()];
        let result = {
            let scope = self.import_path.scoped(&extra);
            self.import(&metadata.import_target.module_path, &scope.entries())
        };

        result.map_err(|e| match e {
            ImportError::ModuleNotFound(_) => PackError::NotInstalled(format!(
                "Pack {} is available but not installed. To install: autopack install {}",
                metadata.pack_id, metadata.pack_id
            )),
            other => PackError::Load(format!("Error loading {}: {}", metadata.pack_id, other)),
        })
    }

    /// Whether the pack's module can be imported at all.
    pub fn check_importable(&self, metadata: &PackMetadata, pack_dir: &Path) -> Result<(), PackError> {
        self.import_pack_module(metadata, pack_dir).map(|_| ())
    }

    /// Resolve a pack to its class.
    ///
    /// A missing module is `NotInstalled`, a module without a matching class
    /// is `NotFound`, and any other import failure is `Load`.
    #[tracing::instrument(skip(self, metadata), fields(pack = %metadata.pack_id))]
    pub fn resolve(&self, metadata: &PackMetadata, pack_dir: &Path) -> Result<ResolvedPack, PackError> {
        let module = self.import_pack_module(metadata, pack_dir)?;

        let class = match &metadata.import_target.class_name {
            Some(class_name) => validate::explicit_pack_class(&module, class_name).ok_or_else(|| {
                PackError::NotFound(format!(
                    "Pack {} found, but class {} is not found in module {}",
                    metadata.pack_id, class_name, metadata.import_target.module_path
                ))
            })?,
            None => {
                let (class, rule) = find_pack_class(&module, &metadata.name).ok_or_else(|| {
                    PackError::NotFound(format!(
                        "Pack {} found, but {} is not found in its module",
                        metadata.pack_id, metadata.name
                    ))
                })?;
                debug!("Matched {} by {:?}", class.qualified_name(), rule);
                class
            }
        };

        Ok(ResolvedPack {
            metadata: Arc::new(metadata.clone()),
            class,
        })
    }
}

/// `a.b.c` -> `a/b/c`; `None` unless every segment is a plain identifier.
fn module_relative_path(module_path: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for segment in module_path.split('.') {
        let valid = !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return None;
        }
        path.push(segment);
    }
    Some(path)
}
