//! The local metadata cache.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

use super::PackMetadata;

pub const METADATA_FILE: &str = "pack_metadata.json";

pub type MetadataMap = BTreeMap<String, PackMetadata>;

/// Reads and writes `pack_metadata.json` in the marker directory.
///
/// A missing or unreadable file means "no data yet": `load` never fails.
/// `save` replaces the whole file; merging is done by the callers
/// (`upsert`, `remove`).
pub struct MetadataStore<'a, R: Runtime> {
    runtime: &'a R,
    pack_dir: PathBuf,
}

impl<'a, R: Runtime> MetadataStore<'a, R> {
    pub fn new(runtime: &'a R, pack_dir: PathBuf) -> Self {
        Self { runtime, pack_dir }
    }

    pub fn pack_dir(&self) -> &Path {
        &self.pack_dir
    }

    /// Returns: `<pack_dir>/pack_metadata.json`
    pub fn path(&self) -> PathBuf {
        self.pack_dir.join(METADATA_FILE)
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> MetadataMap {
        let path = self.path();
        if !self.runtime.exists(&path) {
            debug!("No metadata file at {:?}", path);
            return MetadataMap::new();
        }

        let content = match self.runtime.read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read metadata file {:?}: {:#}", path, e);
                return MetadataMap::new();
            }
        };

        let raw: Map<String, Value> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Ignoring corrupt metadata file {:?}: {}", path, e);
                return MetadataMap::new();
            }
        };

        raw.into_iter()
            .filter_map(|(pack_id, value)| {
                match serde_json::from_value::<PackMetadata>(value) {
                    Ok(meta) => Some((pack_id, meta)),
                    Err(e) => {
                        warn!("Skipping unreadable metadata for {}: {}", pack_id, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Overwrite the cache with `data`, through a temporary file and a rename.
    #[tracing::instrument(skip(self, data))]
    pub fn save(&self, data: &MetadataMap) -> Result<()> {
        if !self.runtime.exists(&self.pack_dir) {
            self.runtime.create_dir_all(&self.pack_dir)?;
        }

        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(data)?;
        self.runtime
            .write(&tmp, content.as_bytes())
            .with_context(|| format!("Failed to write metadata to {:?}", tmp))?;
        self.runtime
            .rename(&tmp, &path)
            .with_context(|| format!("Failed to replace metadata file {:?}", path))
    }

    pub fn get(&self, pack_id: &str) -> Option<PackMetadata> {
        self.load().remove(pack_id)
    }

    /// Replace the record for `metadata.pack_id`.
    pub fn upsert(&self, metadata: PackMetadata) -> Result<()> {
        let mut data = self.load();
        data.insert(metadata.pack_id.clone(), metadata);
        self.save(&data)
    }

    /// Drop a record. Returns whether one existed.
    pub fn remove(&self, pack_id: &str) -> Result<bool> {
        let mut data = self.load();
        if data.remove(pack_id).is_none() {
            return Ok(false);
        }
        self.save(&data)?;
        Ok(true)
    }
}
