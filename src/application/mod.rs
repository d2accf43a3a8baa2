//! Application layer - the `Autopack` façade callers and the CLI go through.
//!
//! It owns the collaborators (registry, VCS, dependency installer, import
//! path, in-process modules) and coordinates the lookup, install and
//! selection flows across them.

mod install;
mod search;
mod select;

pub use search::format_search_result;

use anyhow::Result;
use log::debug;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PackConfig;
use crate::error::PackError;
use crate::http::HttpClient;
use crate::install::{DependencyInstaller, GitCli, PipInstaller, Vcs};
use crate::loader::{ImportPath, Loader, ModuleRegistry, ResolvedPack};
use crate::package::{MetadataStore, PackMetadata, find_or_create_pack_dir};
use crate::registry::{HttpRegistry, Registry};
use crate::runtime::Runtime;

const USER_AGENT: &str = "autopack-cli";

/// Entry point for getting, installing and selecting packs.
pub struct Autopack<R: Runtime> {
    runtime: R,
    config: PackConfig,
    registry: Arc<dyn Registry>,
    vcs: Arc<dyn Vcs>,
    dependencies: Arc<dyn DependencyInstaller>,
    import_path: ImportPath,
    modules: ModuleRegistry,
}

impl<R: Runtime> Autopack<R> {
    /// Build with the HTTP registry, `git` and `pip` described by `config`.
    pub fn new(runtime: R, config: PackConfig) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let registry = HttpRegistry::new(HttpClient::new(client), config.api_url.clone());
        let dependencies = PipInstaller::new(config.pip.clone());

        Ok(Self {
            import_path: ImportPath::new(config.module_paths.clone()),
            runtime,
            config,
            registry: Arc::new(registry),
            vcs: Arc::new(GitCli::default()),
            dependencies: Arc::new(dependencies),
            modules: ModuleRegistry::new(),
        })
    }

    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_vcs(mut self, vcs: Arc<dyn Vcs>) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn with_dependency_installer(mut self, installer: Arc<dyn DependencyInstaller>) -> Self {
        self.dependencies = installer;
        self
    }

    /// Make in-process modules importable by module path.
    pub fn with_modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = modules;
        self
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn import_path(&self) -> &ImportPath {
        &self.import_path
    }

    /// The marker directory, created when missing.
    pub fn pack_dir(&self) -> Result<PathBuf> {
        find_or_create_pack_dir(&self.runtime, &self.config)
    }

    fn pack_dir_or(&self, to_error: fn(String) -> PackError) -> Result<PathBuf, PackError> {
        self.pack_dir().map_err(|e| to_error(format!("{:#}", e)))
    }

    fn loader(&self) -> Loader<'_, R> {
        Loader::new(&self.runtime, &self.import_path, &self.modules)
    }

    /// The metadata record for `pack_id`, from the registry when `remote`,
    /// otherwise from the local store.
    pub async fn get_pack_details(
        &self,
        pack_id: &str,
        remote: bool,
    ) -> Result<Option<PackMetadata>, PackError> {
        if remote {
            return self.registry.details(pack_id).await;
        }
        let pack_dir = self.pack_dir_or(PackError::Load)?;
        Ok(MetadataStore::new(&self.runtime, pack_dir).get(pack_id))
    }

    /// Resolve a pack to its class.
    ///
    /// # Errors
    ///
    /// - `NotFound` when no record exists or no class in its module matches
    /// - `NotInstalled` when the record exists but its module cannot be found
    /// - `Load` when the module exists but fails to import
    /// - `Fetch` when `remote` is set and the registry cannot be reached
    #[tracing::instrument(skip(self))]
    pub async fn get_pack(&self, pack_id: &str, remote: bool) -> Result<ResolvedPack, PackError> {
        let metadata = self
            .get_pack_details(pack_id, remote)
            .await?
            .ok_or_else(|| PackError::NotFound(format!("Pack {} not found", pack_id)))?;
        let pack_dir = self.pack_dir_or(PackError::Load)?;
        self.loader().resolve(&metadata, &pack_dir)
    }

    /// Like [`Autopack::get_pack`], but `None` on any pack error.
    pub async fn try_get_pack(&self, pack_id: &str, remote: bool) -> Option<ResolvedPack> {
        match self.get_pack(pack_id, remote).await {
            Ok(pack) => Some(pack),
            Err(e) => {
                debug!("Could not get pack {}: {}", pack_id, e);
                None
            }
        }
    }

    /// The packs among `pack_ids` that resolve, in the given order.
    pub async fn try_get_packs<S: AsRef<str>>(&self, pack_ids: &[S], remote: bool) -> Vec<ResolvedPack> {
        let mut packs = Vec::with_capacity(pack_ids.len());
        for pack_id in pack_ids {
            if let Some(pack) = self.try_get_pack(pack_id.as_ref(), remote).await {
                packs.push(pack);
            }
        }
        packs
    }

    /// Identifiers recorded in the local store.
    pub fn installed_pack_ids(&self) -> Result<Vec<String>, PackError> {
        let pack_dir = self.pack_dir_or(PackError::Load)?;
        Ok(MetadataStore::new(&self.runtime, pack_dir)
            .load()
            .into_keys()
            .collect())
    }

    /// Every recorded pack that currently resolves.
    pub async fn get_all_installed_packs(&self) -> Vec<ResolvedPack> {
        match self.installed_pack_ids() {
            Ok(ids) => self.try_get_packs(&ids, false).await,
            Err(e) => {
                debug!("No installed packs: {}", e);
                Vec::new()
            }
        }
    }
}
