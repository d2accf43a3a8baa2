//! Version control operations for git-sourced packs.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, info};
use std::path::Path;
use tokio::process::Command;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `url` into `dest`, which must not exist yet.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Bring an existing checkout at `dir` up to date.
    async fn pull(&self, dir: &Path) -> Result<()>;
}

/// The `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str], dir: Option<&Path>, action: &str) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        debug!("Running {} {:?}", self.program, args);

        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to run {} {}", self.program, action))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} {} failed: {}", self.program, action, stderr.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl Vcs for GitCli {
    #[tracing::instrument(skip(self))]
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        info!("Cloning {} into {:?}", url, dest);
        let dest = dest.to_string_lossy();
        self.run(&["clone", url, &dest], None, "clone").await
    }

    #[tracing::instrument(skip(self))]
    async fn pull(&self, dir: &Path) -> Result<()> {
        info!("Repository already exists at {:?}, pulling updates", dir);
        self.run(&["pull", "--ff-only"], Some(dir), "pull").await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    /// A fake `git` that records its arguments and working directory.
    fn fake_git(dir: &Path, exit_code: i32) -> String {
        let script = dir.join("git");
        let log = dir.join("git.log");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$PWD $*\" >> {}\necho oops >&2\nexit {}\n",
                log.display(),
                exit_code
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_clone_and_pull_commands() {
        let dir = tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let git = GitCli::new(fake_git(dir.path(), 0));

        git.clone_repo("https://example.com/r.git", &work.join("dest"))
            .await
            .unwrap();
        git.pull(&work).await.unwrap();

        let log = std::fs::read_to_string(dir.path().join("git.log")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert!(lines[0].ends_with(&format!(
            "clone https://example.com/r.git {}",
            work.join("dest").display()
        )));
        assert_eq!(lines[1], format!("{} pull --ff-only", work.display()));
    }

    #[tokio::test]
    async fn test_failure_includes_stderr() {
        let dir = tempdir().unwrap();
        let git = GitCli::new(fake_git(dir.path(), 128));

        let err = git
            .clone_repo("https://example.com/r.git", &dir.path().join("dest"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("clone failed: oops"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let git = GitCli::new("/nonexistent/git");
        assert!(git.pull(Path::new("/")).await.is_err());
    }
}
