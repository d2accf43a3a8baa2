//! Materializing pack sources on disk.
//!
//! # Structure
//!
//! - `vcs` - clone and pull through `git`
//! - `deps` - declared dependencies and the installer-style policy
//! - `cleanup` - removal of half-written source directories

mod cleanup;
mod deps;
mod vcs;

pub use cleanup::CleanupGuard;
pub use deps::{DependencyInstaller, DependencyReport, PipInstaller, provision_dependencies};
pub use vcs::{GitCli, Vcs};

#[cfg(test)]
pub use deps::MockDependencyInstaller;
#[cfg(test)]
pub use vcs::MockVcs;

use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::error::PackError;
use crate::loader::Loader;
use crate::package::{PackMetadata, PackSource, source_dir};
use crate::runtime::Runtime;

/// Ensures a pack's source is present, cloning or updating it as needed.
pub struct Installer<'a, R: Runtime> {
    runtime: &'a R,
    vcs: &'a dyn Vcs,
    loader: Loader<'a, R>,
}

impl<'a, R: Runtime> Installer<'a, R> {
    pub fn new(runtime: &'a R, vcs: &'a dyn Vcs, loader: Loader<'a, R>) -> Self {
        Self {
            runtime,
            vcs,
            loader,
        }
    }

    /// Make the pack's source available and return its directory.
    ///
    /// Git sources are cloned on first use and pulled afterwards, so calling
    /// this repeatedly leaves exactly one checkout. Local packages are only
    /// checked for importability.
    #[tracing::instrument(skip(self, metadata), fields(pack = %metadata.pack_id))]
    pub async fn ensure_installed(
        &self,
        metadata: &PackMetadata,
        pack_dir: &Path,
    ) -> Result<PathBuf, PackError> {
        let dir = source_dir(metadata, pack_dir);

        match &metadata.source {
            PackSource::LocalPackage { .. } => {
                self.loader.check_importable(metadata, pack_dir)?;
                debug!("Local package {} is importable", metadata.pack_id);
                Ok(dir)
            }
            PackSource::Git { url } => {
                if self.runtime.is_dir(&dir) {
                    if let Err(e) = self.vcs.pull(&dir).await {
                        warn!("Updating {:?} failed, using existing checkout: {:#}", dir, e);
                    }
                    return Ok(dir);
                }

                if !self.runtime.exists(pack_dir) {
                    self.runtime.create_dir_all(pack_dir).map_err(|e| {
                        PackError::Installation(format!(
                            "Failed to create {:?}: {:#}",
                            pack_dir, e
                        ))
                    })?;
                }

                let guard = CleanupGuard::new(self.runtime, dir.clone());
                self.vcs.clone_repo(url, &dir).await.map_err(|e| {
                    PackError::Installation(format!("Failed to clone {}: {:#}", url, e))
                })?;
                guard.success();
                Ok(dir)
            }
        }
    }
}
