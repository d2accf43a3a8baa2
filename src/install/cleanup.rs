use log::{debug, warn};
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Removes a partially installed source directory unless the install succeeds.
///
/// Call [`CleanupGuard::success`] once the directory holds a usable pack;
/// dropping the guard otherwise deletes the directory.
pub struct CleanupGuard<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
    armed: bool,
}

impl<'a, R: Runtime> CleanupGuard<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf) -> Self {
        Self {
            runtime,
            path,
            armed: true,
        }
    }

    /// Keep the directory.
    pub fn success(mut self) {
        self.armed = false;
    }
}

impl<R: Runtime> Drop for CleanupGuard<'_, R> {
    fn drop(&mut self) {
        if !self.armed || !self.runtime.exists(&self.path) {
            return;
        }
        debug!("Cleaning up: {:?}", self.path);
        if let Err(e) = self.runtime.remove_dir_all(&self.path) {
            warn!("Failed to clean up {:?}: {:#}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use tempfile::tempdir;

    #[test]
    fn test_drop_without_success_removes_dir() {
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("partial");
        std::fs::create_dir(&sub_dir).unwrap();
        std::fs::write(sub_dir.join("file.txt"), "test").unwrap();

        {
            let _guard = CleanupGuard::new(&RealRuntime, sub_dir.clone());
        }

        assert!(!sub_dir.exists());
    }

    #[test]
    fn test_success_keeps_dir() {
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("complete");
        std::fs::create_dir(&sub_dir).unwrap();

        let guard = CleanupGuard::new(&RealRuntime, sub_dir.clone());
        guard.success();

        assert!(sub_dir.exists());
    }

    #[test]
    fn test_missing_dir_is_not_removed() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/packs/never_created");

        runtime
            .expect_exists()
            .with(eq(path.clone()))
            .returning(|_| false);
        runtime.expect_remove_dir_all().never();

        drop(CleanupGuard::new(&runtime, path));
    }
}
