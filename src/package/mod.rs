//! Pack metadata records and their local storage
//!
//! This module holds the canonical metadata record, the metadata cache in
//! the marker directory, marker directory discovery, and the naming of
//! installed source directories.

mod discovery;
mod metadata;
mod naming;
mod store;

pub use discovery::{MARKER_DIR, find_or_create_pack_dir};
pub use metadata::{ArgSchema, ArgSpec, ImportTarget, PackMetadata, PackSource, SourceKind};
pub use naming::{DirNaming, sanitize, source_dir};
pub use store::{METADATA_FILE, MetadataMap, MetadataStore};
