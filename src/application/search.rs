//! Search use case.

use super::Autopack;
use crate::error::PackError;
use crate::package::PackMetadata;
use crate::runtime::Runtime;

impl<R: Runtime> Autopack<R> {
    /// Registry records matching `query`.
    pub async fn search(&self, query: &str) -> Result<Vec<PackMetadata>, PackError> {
        self.registry.search(query).await
    }
}

/// One search result block as the CLI prints it.
pub fn format_search_result(metadata: &PackMetadata) -> String {
    let run_args = serde_json::to_string(&metadata.run_args).unwrap_or_else(|_| "{}".to_string());
    format!(
        "--------\nPack ID:      {}\nDependencies: {}\nDescription:  {}\nRun Args:     {}",
        metadata.pack_id,
        metadata.dependencies.join(", "),
        metadata.description,
        run_args
    )
}
