//! Deterministic directory names for installed sources.

use std::path::{Path, PathBuf};

use super::metadata::{PackMetadata, PackSource, SourceKind};

/// How an installed source directory is named inside the marker directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirNaming {
    /// The source URL with every non-alphanumeric character replaced by `_`.
    SanitizedUrl,
    /// `author_repo_name`, sanitized the same way.
    AuthorRepoName,
}

impl DirNaming {
    pub fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Git => DirNaming::SanitizedUrl,
            SourceKind::LocalPackage => DirNaming::AuthorRepoName,
        }
    }

    pub fn dir_name(&self, metadata: &PackMetadata) -> String {
        match (self, &metadata.source) {
            (DirNaming::SanitizedUrl, PackSource::Git { url }) => sanitize(url),
            (DirNaming::SanitizedUrl, PackSource::LocalPackage { .. }) => {
                sanitize(&metadata.pack_id)
            }
            (DirNaming::AuthorRepoName, _) => match metadata.author_and_repo() {
                Some((author, repo)) => {
                    sanitize(&format!("{}_{}_{}", author, repo, metadata.name))
                }
                None => sanitize(&metadata.pack_id),
            },
        }
    }
}

/// Replace every character that is not ASCII alphanumeric with `_`.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Directory holding a pack's source.
///
/// A local package with a declared path lives there; everything else lives
/// under `pack_dir`, named by the strategy for its source kind.
pub fn source_dir(metadata: &PackMetadata, pack_dir: &Path) -> PathBuf {
    if let PackSource::LocalPackage { path: Some(path) } = &metadata.source {
        return path.clone();
    }
    pack_dir.join(DirNaming::for_kind(metadata.source_kind()).dir_name(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::ImportTarget;

    fn git_pack() -> PackMetadata {
        PackMetadata::new(
            "erik-megarad/tools/web_search",
            "web_search",
            PackSource::Git {
                url: "https://github.com/erik-megarad/tools.git".into(),
            },
            ImportTarget::module("tools.web_search"),
        )
    }

    fn local_pack() -> PackMetadata {
        PackMetadata::new(
            "erik-megarad/tools/read_file",
            "read_file",
            PackSource::LocalPackage { path: None },
            ImportTarget::class("tools.files", "ReadFile"),
        )
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(
            sanitize("https://github.com/a/b.git"),
            "https___github_com_a_b_git"
        );
        assert_eq!(sanitize("abc123"), "abc123");
    }

    #[test]
    fn test_git_uses_sanitized_url() {
        let dir = source_dir(&git_pack(), Path::new("/p"));
        assert_eq!(
            dir,
            PathBuf::from("/p/https___github_com_erik_megarad_tools_git")
        );
    }

    #[test]
    fn test_local_package_uses_author_repo_name() {
        let dir = source_dir(&local_pack(), Path::new("/p"));
        assert_eq!(dir, PathBuf::from("/p/erik_megarad_tools_read_file"));
    }

    #[test]
    fn test_local_package_declared_path_wins() {
        let mut pack = local_pack();
        pack.source = PackSource::LocalPackage {
            path: Some(PathBuf::from("/opt/tools")),
        };
        assert_eq!(source_dir(&pack, Path::new("/p")), PathBuf::from("/opt/tools"));
    }

    #[test]
    fn test_strategies_are_distinct() {
        let pack = git_pack();
        assert_ne!(
            DirNaming::SanitizedUrl.dir_name(&pack),
            DirNaming::AuthorRepoName.dir_name(&pack)
        );
        assert_eq!(
            DirNaming::AuthorRepoName.dir_name(&pack),
            "erik_megarad_tools_web_search"
        );
    }
}
