//! Declared pack dependencies and the policy for installing them.

use anyhow::{Result, bail};
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::process::Command;

use crate::config::InstallerStyle;
use crate::runtime::Runtime;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn is_installed(&self, dependency: &str) -> bool;
    async fn install(&self, dependency: &str) -> Result<()>;
}

/// Installs dependencies with `pip`.
#[derive(Debug, Clone)]
pub struct PipInstaller {
    program: String,
}

impl PipInstaller {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl DependencyInstaller for PipInstaller {
    async fn is_installed(&self, dependency: &str) -> bool {
        Command::new(&self.program)
            .args(["show", "--quiet", dependency])
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    async fn install(&self, dependency: &str) -> Result<()> {
        let output = Command::new(&self.program)
            .args(["install", dependency])
            .output()
            .await?;
        if !output.status.success() {
            bail!(
                "{} install {} failed: {}",
                self.program,
                dependency,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// What happened to each declared dependency.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    pub already_present: Vec<String>,
    pub installed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Install missing dependencies according to `style`.
///
/// `force` installs without asking whatever the style. A dependency that
/// fails to install is reported and skipped; it never fails the pack install.
#[tracing::instrument(skip(runtime, installer))]
pub async fn provision_dependencies<R: Runtime>(
    runtime: &R,
    installer: &dyn DependencyInstaller,
    dependencies: &[String],
    style: InstallerStyle,
    force: bool,
) -> DependencyReport {
    let mut report = DependencyReport::default();

    for dependency in dependencies {
        if installer.is_installed(dependency).await {
            debug!("Dependency {} already installed", dependency);
            report.already_present.push(dependency.clone());
            continue;
        }

        let approved = match (force, style) {
            (true, _) | (false, InstallerStyle::Automatic) => true,
            (false, InstallerStyle::Semiautomatic) => {
                let prompt = format!(
                    "This pack requires the dependency {} to be installed. Continue?",
                    dependency
                );
                runtime.confirm(&prompt, true).unwrap_or_else(|e| {
                    warn!("Could not read confirmation: {:#}", e);
                    false
                })
            }
            (false, InstallerStyle::Manual) => {
                info!(
                    "Dependency {} is not installed; install it manually",
                    dependency
                );
                false
            }
        };

        if !approved {
            info!("Skipping install of {}", dependency);
            report.skipped.push(dependency.clone());
            continue;
        }

        match installer.install(dependency).await {
            Ok(()) => {
                info!("{} has been successfully installed.", dependency);
                report.installed.push(dependency.clone());
            }
            Err(e) => {
                warn!("Installation of {} failed: {:#}", dependency, e);
                report.failed.push(dependency.clone());
            }
        }
    }

    report
}
