use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Ordered list of directories searched for manifest modules.
///
/// Only [`ImportPath::scoped`] adds entries, and the returned guard takes
/// them out again when dropped.
#[derive(Debug, Default)]
pub struct ImportPath {
    entries: Mutex<Vec<PathBuf>>,
}

impl ImportPath {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current search order.
    pub fn entries(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    /// Prepend `extra` (keeping its order) until the returned scope is dropped.
    pub fn scoped(&self, extra: &[PathBuf]) -> ImportScope<'_> {
        let mut entries = self.lock();
        for (i, dir) in extra.iter().enumerate() {
            entries.insert(i, dir.clone());
        }
        ImportScope {
            path: self,
            inserted: extra.to_vec(),
        }
    }
}

/// Entries prepended to an [`ImportPath`] for the lifetime of this value.
#[derive(Debug)]
pub struct ImportScope<'a> {
    path: &'a ImportPath,
    inserted: Vec<PathBuf>,
}

impl ImportScope<'_> {
    pub fn entries(&self) -> Vec<PathBuf> {
        self.path.entries()
    }
}

impl Drop for ImportScope<'_> {
    fn drop(&mut self) {
        let mut entries = self.path.lock();
        for dir in &self.inserted {
            if let Some(pos) = entries.iter().position(|e| e == dir) {
                entries.remove(pos);
            }
        }
    }
}
