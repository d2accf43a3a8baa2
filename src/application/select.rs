//! Selection use case - choose packs for a task, then load them.

use anyhow::Result;
use log::{debug, warn};

use super::Autopack;
use crate::config::CandidatePool;
use crate::llm::LanguageModel;
use crate::loader::ResolvedPack;
use crate::package::{MetadataStore, PackMetadata};
use crate::runtime::Runtime;
use crate::selection::Selector;

impl<R: Runtime> Autopack<R> {
    /// Records the selector may choose from, per `selection_pool`.
    pub async fn selection_candidates(&self) -> Result<Vec<PackMetadata>> {
        match self.config.selection_pool {
            CandidatePool::Installed => {
                let store = MetadataStore::new(&self.runtime, self.pack_dir()?);
                Ok(store.load().into_values().collect())
            }
            CandidatePool::Remote => Ok(self.registry.search("").await?),
        }
    }

    /// Identifiers of the packs `model` picks for `task`.
    #[tracing::instrument(skip(self, model))]
    pub async fn select_packs(&self, task: &str, model: &dyn LanguageModel) -> Result<Vec<String>> {
        let candidates = self.selection_candidates().await?;
        Selector::from_config(&self.config)
            .select(task, &candidates, model)
            .await
    }

    /// Select packs for `task` and resolve the ones that load.
    ///
    /// Packs chosen from the remote pool are installed on use when the
    /// installer style allows it.
    pub async fn select_and_load(
        &self,
        task: &str,
        model: &dyn LanguageModel,
    ) -> Result<Vec<ResolvedPack>> {
        let selected = self.select_packs(task, model).await?;
        debug!("Loading selected packs: {:?}", selected);

        match self.config.selection_pool {
            CandidatePool::Installed => Ok(self.try_get_packs(&selected, false).await),
            CandidatePool::Remote => {
                let mut packs = Vec::with_capacity(selected.len());
                for pack_id in &selected {
                    match self.get_or_install_pack(pack_id).await {
                        Ok(pack) => packs.push(pack),
                        Err(e) => warn!("Skipping selected pack {}: {}", pack_id, e),
                    }
                }
                Ok(packs)
            }
        }
    }
}
