use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::config::PackConfig;
use crate::runtime::Runtime;

/// Name of the marker directory holding the metadata cache and installed sources.
pub const MARKER_DIR: &str = ".autopack";

/// The current directory plus this many parents are probed.
const PARENT_SEARCH_DEPTH: usize = 4;

/// Locate the marker directory.
///
/// Order: explicit `pack_dir` from the config, else an existing `.autopack`
/// in the current directory or one of its parents, else a new `.autopack` in
/// the current directory.
#[tracing::instrument(skip(runtime, config))]
pub fn find_or_create_pack_dir<R: Runtime>(runtime: &R, config: &PackConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.pack_dir {
        if !runtime.exists(dir) {
            runtime
                .create_dir_all(dir)
                .with_context(|| format!("Failed to create pack directory {:?}", dir))?;
        }
        return Ok(dir.clone());
    }

    let cwd = runtime.current_dir()?;
    for dir in cwd.ancestors().take(PARENT_SEARCH_DEPTH + 1) {
        let candidate = dir.join(MARKER_DIR);
        if runtime.is_dir(&candidate) {
            debug!("Found pack directory at {:?}", candidate);
            return Ok(candidate);
        }
    }

    let created = cwd.join(MARKER_DIR);
    debug!("No pack directory found, creating {:?}", created);
    runtime
        .create_dir_all(&created)
        .with_context(|| format!("Failed to create pack directory {:?}", created))?;
    Ok(created)
}
