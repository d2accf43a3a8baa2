//! Configuration for pack resolution, installation and selection.
//!
//! Every setting has a matching `AUTOPACK_` environment variable. A config is
//! built once (usually with [`PackConfig::from_env`]) and handed explicitly to
//! the components that need it.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::runtime::Runtime;

pub const DEFAULT_API_URL: &str = "https://autopack.ai/";
pub const DEFAULT_WORKSPACE_PATH: &str = "workspace";
pub const DEFAULT_PIP: &str = "pip";

/// How eagerly packs and their dependencies get installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallerStyle {
    /// Packs and dependencies are installed without asking.
    #[default]
    Automatic,
    /// Packs are installed without asking, each dependency is confirmed.
    Semiautomatic,
    /// Nothing is installed on use; dependencies are never installed.
    Manual,
}

impl fmt::Display for InstallerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallerStyle::Automatic => write!(f, "automatic"),
            InstallerStyle::Semiautomatic => write!(f, "semiautomatic"),
            InstallerStyle::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for InstallerStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "automatic" => Ok(InstallerStyle::Automatic),
            "semiautomatic" => Ok(InstallerStyle::Semiautomatic),
            "manual" => Ok(InstallerStyle::Manual),
            _ => anyhow::bail!(
                "Unknown installer style: {}. Expected automatic, semiautomatic, or manual.",
                s
            ),
        }
    }
}

/// Where the selector draws its candidates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidatePool {
    /// Packs recorded in the local metadata store.
    #[default]
    Installed,
    /// The full remote catalog.
    Remote,
}

impl FromStr for CandidatePool {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "installed" | "local" => Ok(CandidatePool::Installed),
            "remote" => Ok(CandidatePool::Remote),
            _ => anyhow::bail!(
                "Unknown selection pool: {}. Expected installed or remote.",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackConfig {
    /// Explicit marker directory; skips the directory probe when set.
    pub pack_dir: Option<PathBuf>,
    /// Base URL of the pack registry.
    pub api_url: String,
    /// Extra directories searched for modules, before any install directory.
    pub module_paths: Vec<PathBuf>,
    /// Directory for artifacts and working files, handed to packs.
    pub workspace_path: PathBuf,
    pub installer_style: InstallerStyle,
    /// Signals to packs that they should not execute code.
    pub restrict_code_execution: bool,
    pub selection_pool: CandidatePool,
    /// Address candidates by small integers instead of identifiers in prompts.
    pub pseudo_ids: bool,
    /// Program used to check and install pack dependencies.
    pub pip: String,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            pack_dir: None,
            api_url: DEFAULT_API_URL.to_string(),
            module_paths: Vec::new(),
            workspace_path: PathBuf::from(DEFAULT_WORKSPACE_PATH),
            installer_style: InstallerStyle::default(),
            restrict_code_execution: false,
            selection_pool: CandidatePool::default(),
            pseudo_ids: true,
            pip: DEFAULT_PIP.to_string(),
        }
    }
}

impl PackConfig {
    /// Build a config from `AUTOPACK_*` environment variables, falling back to defaults.
    #[tracing::instrument(skip(runtime))]
    pub fn from_env<R: Runtime>(runtime: &R) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = runtime.env_var("AUTOPACK_DIR")
            && !dir.is_empty()
        {
            config.pack_dir = Some(PathBuf::from(dir));
        }
        if let Ok(url) = runtime.env_var("AUTOPACK_API_URL")
            && !url.is_empty()
        {
            config.api_url = url;
        }
        if let Ok(paths) = runtime.env_var("AUTOPACK_PATH") {
            config.module_paths = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Ok(workspace) = runtime.env_var("AUTOPACK_WORKSPACE_PATH")
            && !workspace.is_empty()
        {
            config.workspace_path = PathBuf::from(workspace);
        }
        if let Ok(style) = runtime.env_var("AUTOPACK_INSTALLER_STYLE") {
            config.installer_style = style
                .parse()
                .context("Invalid AUTOPACK_INSTALLER_STYLE")?;
        }
        if let Ok(flag) = runtime.env_var("AUTOPACK_RESTRICT_CODE_EXECUTION") {
            config.restrict_code_execution =
                parse_bool(&flag).context("Invalid AUTOPACK_RESTRICT_CODE_EXECUTION")?;
        }
        if let Ok(pool) = runtime.env_var("AUTOPACK_SELECTION_POOL") {
            config.selection_pool = pool.parse().context("Invalid AUTOPACK_SELECTION_POOL")?;
        }
        if let Ok(flag) = runtime.env_var("AUTOPACK_PSEUDO_IDS") {
            config.pseudo_ids = parse_bool(&flag).context("Invalid AUTOPACK_PSEUDO_IDS")?;
        }
        if let Ok(pip) = runtime.env_var("AUTOPACK_PIP")
            && !pip.is_empty()
        {
            config.pip = pip;
        }

        debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    /// Whether packs may be installed implicitly when first requested.
    pub fn installs_on_use(&self) -> bool {
        self.installer_style != InstallerStyle::Manual
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use std::collections::HashMap;

    fn runtime_with_env(vars: &[(&str, &str)]) -> MockRuntime {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut runtime = MockRuntime::new();
        runtime.expect_env_var().returning(move |key| {
            vars.get(key)
                .cloned()
                .ok_or(std::env::VarError::NotPresent)
        });
        runtime
    }

    #[test]
    fn test_defaults_without_env() {
        let runtime = runtime_with_env(&[]);
        let config = PackConfig::from_env(&runtime).unwrap();
        assert_eq!(config, PackConfig::default());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.installer_style, InstallerStyle::Automatic);
        assert!(config.pseudo_ids);
    }

    #[test]
    fn test_env_overrides() {
        let runtime = runtime_with_env(&[
            ("AUTOPACK_DIR", "/tmp/packs"),
            ("AUTOPACK_API_URL", "http://localhost:9000"),
            ("AUTOPACK_INSTALLER_STYLE", "Manual"),
            ("AUTOPACK_RESTRICT_CODE_EXECUTION", "true"),
            ("AUTOPACK_SELECTION_POOL", "remote"),
            ("AUTOPACK_PSEUDO_IDS", "0"),
            ("AUTOPACK_WORKSPACE_PATH", "/tmp/ws"),
            ("AUTOPACK_PIP", "pip3"),
        ]);
        let config = PackConfig::from_env(&runtime).unwrap();

        assert_eq!(config.pack_dir, Some(PathBuf::from("/tmp/packs")));
        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.installer_style, InstallerStyle::Manual);
        assert!(config.restrict_code_execution);
        assert_eq!(config.selection_pool, CandidatePool::Remote);
        assert!(!config.pseudo_ids);
        assert_eq!(config.workspace_path, PathBuf::from("/tmp/ws"));
        assert_eq!(config.pip, "pip3");
        assert!(!config.installs_on_use());
    }

    #[cfg(unix)]
    #[test]
    fn test_module_paths_are_split() {
        let runtime = runtime_with_env(&[("AUTOPACK_PATH", "/a:/b::/c")]);
        let config = PackConfig::from_env(&runtime).unwrap();
        assert_eq!(
            config.module_paths,
            vec![
                PathBuf::from("/a"),
                PathBuf::from("/b"),
                PathBuf::from("/c")
            ]
        );
    }

    #[test]
    fn test_invalid_installer_style() {
        let runtime = runtime_with_env(&[("AUTOPACK_INSTALLER_STYLE", "sometimes")]);
        assert!(PackConfig::from_env(&runtime).is_err());
    }

    #[test]
    fn test_installer_style_round_trip() {
        for style in [
            InstallerStyle::Automatic,
            InstallerStyle::Semiautomatic,
            InstallerStyle::Manual,
        ] {
            assert_eq!(style.to_string().parse::<InstallerStyle>().unwrap(), style);
        }
    }
}
