//! Choosing packs for a task with a language model.
//!
//! # Structure
//!
//! - `candidate` - the per-call table of offered packs and their keys
//! - `prompt` - the instruction text sent to the model
//! - `parse` - reading identifiers back out of the reply

mod candidate;
mod parse;
mod prompt;

pub use candidate::{Addressing, CandidateTable, SelectionCandidate};
pub use parse::parse_selection;
pub use prompt::build_prompt;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::config::PackConfig;
use crate::llm::LanguageModel;
use crate::package::PackMetadata;

/// Asks a model which packs a task needs.
#[derive(Debug, Clone, Copy)]
pub struct Selector {
    addressing: Addressing,
}

impl Selector {
    pub fn new(addressing: Addressing) -> Self {
        Self { addressing }
    }

    pub fn from_config(config: &PackConfig) -> Self {
        Self::new(if config.pseudo_ids {
            Addressing::PseudoId
        } else {
            Addressing::RealId
        })
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    /// Identifiers of the packs the model picked, in the order it named them.
    ///
    /// Only identifiers present in `candidates` are returned. The model is not
    /// consulted when there is nothing to choose from.
    #[tracing::instrument(skip(self, candidates, model), fields(candidates = candidates.len()))]
    pub async fn select(
        &self,
        task: &str,
        candidates: &[PackMetadata],
        model: &dyn LanguageModel,
    ) -> Result<Vec<String>> {
        let table = CandidateTable::new(
            candidates.iter().map(SelectionCandidate::from).collect(),
            self.addressing,
        );
        if table.is_empty() {
            debug!("No candidates to select from");
            return Ok(Vec::new());
        }

        let prompt = build_prompt(task, &table);
        let reply = model
            .complete(&prompt)
            .await
            .context("Tool selection request failed")?;
        debug!("Selection reply: {}", reply);

        let selected = parse_selection(&reply, &table);
        info!("Selected {} of {} packs", selected.len(), table.len());
        Ok(selected)
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new(Addressing::PseudoId)
    }
}
