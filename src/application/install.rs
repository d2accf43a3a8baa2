//! Install use case - fetch a record, provision it, and verify it loads.

use log::{debug, info, warn};
use std::path::Path;

use super::Autopack;
use crate::error::PackError;
use crate::install::{Installer, provision_dependencies};
use crate::loader::ResolvedPack;
use crate::package::{MetadataStore, PackMetadata, PackSource, source_dir};
use crate::runtime::Runtime;

const STILL_NOT_FOUND: &str = "Installation completed but pack could still not be found";

impl<R: Runtime> Autopack<R> {
    /// Install a pack from the registry and return it resolved.
    ///
    /// A pack that already resolves locally is returned without contacting
    /// the registry. `force` installs missing dependencies without asking.
    ///
    /// # Errors
    ///
    /// Always `PackError::Installation`. Registry failures happen before
    /// anything is written; a pack that does not resolve after install has
    /// its source directory and record removed.
    #[tracing::instrument(skip(self))]
    pub async fn install_pack(&self, pack_id: &str, force: bool) -> Result<ResolvedPack, PackError> {
        if let Some(pack) = self.try_get_pack(pack_id, false).await {
            info!("Pack {} already installed.", pack_id);
            return Ok(pack);
        }

        let mut metadata = match self.registry.details(pack_id).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                return Err(PackError::Installation(format!(
                    "Could not find pack details for {}",
                    pack_id
                )));
            }
            Err(e) => return Err(PackError::Installation(e.to_string())),
        };
        if metadata.pack_id != pack_id {
            warn!(
                "Registry returned {} for {}, recording it under the requested id",
                metadata.pack_id, pack_id
            );
            metadata.pack_id = pack_id.to_string();
        }

        let report = provision_dependencies(
            &self.runtime,
            self.dependencies.as_ref(),
            &metadata.dependencies,
            self.config.installer_style,
            force,
        )
        .await;
        if !report.failed.is_empty() {
            warn!(
                "Some dependencies of {} failed to install: {}",
                pack_id,
                report.failed.join(", ")
            );
        }

        let pack_dir = self.pack_dir_or(PackError::Installation)?;
        let installer = Installer::new(&self.runtime, self.vcs.as_ref(), self.loader());
        installer
            .ensure_installed(&metadata, &pack_dir)
            .await
            .map_err(|e| match e {
                PackError::Installation(_) => e,
                other => PackError::Installation(other.to_string()),
            })?;

        let store = MetadataStore::new(&self.runtime, pack_dir.clone());
        store
            .upsert(metadata.clone())
            .map_err(|e| PackError::Installation(format!("{:#}", e)))?;

        match self.get_pack(pack_id, false).await {
            Ok(pack) => {
                info!("Installed {}", pack.qualified_name());
                Ok(pack)
            }
            Err(e) => {
                warn!("Installed pack {} does not load: {}", pack_id, e);
                self.roll_back(&store, &metadata, &pack_dir);
                Err(PackError::Installation(STILL_NOT_FOUND.to_string()))
            }
        }
    }

    /// Resolve a pack, installing it first when it is missing and the
    /// installer style allows installing on use.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_install_pack(&self, pack_id: &str) -> Result<ResolvedPack, PackError> {
        match self.get_pack(pack_id, false).await {
            Ok(pack) => Ok(pack),
            Err(e) if e.is_recoverable_by_install() && self.config.installs_on_use() => {
                debug!("{}; installing", e);
                self.install_pack(pack_id, false).await
            }
            Err(e) => Err(e),
        }
    }

    /// Remove what a failed install left behind. Local package directories are never touched.
    fn roll_back(&self, store: &MetadataStore<'_, R>, metadata: &PackMetadata, pack_dir: &Path) {
        if let PackSource::Git { .. } = metadata.source {
            let dir = source_dir(metadata, pack_dir);
            if self.runtime.is_dir(&dir) {
                debug!("Removing {:?}", dir);
                if let Err(e) = self.runtime.remove_dir_all(&dir) {
                    warn!("Failed to remove {:?}: {:#}", dir, e);
                }
            }
        }
        if let Err(e) = store.remove(&metadata.pack_id) {
            warn!("Failed to remove record {}: {:#}", metadata.pack_id, e);
        }
    }
}
