//! Environment and system information operations.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn env_var_impl(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn current_dir_impl(&self) -> Result<PathBuf> {
        env::current_dir().context("Failed to determine current directory")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn find_executable_impl(&self, name: &str) -> Option<PathBuf> {
        let candidate = Path::new(name);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }

        let paths = env::var_os("PATH")?;
        env::split_paths(&paths)
            .flat_map(|dir| executable_names(name).map(move |file| dir.join(file)))
            .find(|path| path.is_file())
    }
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> impl Iterator<Item = String> {
    std::iter::once(name.to_string())
}

#[cfg(windows)]
fn executable_names(name: &str) -> impl Iterator<Item = String> {
    let name = name.to_string();
    ["", ".exe", ".cmd", ".bat"]
        .into_iter()
        .map(move |ext| format!("{}{}", name, ext))
}
