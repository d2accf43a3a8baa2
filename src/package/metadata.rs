use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Kind of source a pack is materialized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Git,
    LocalPackage,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Git => write!(f, "git"),
            SourceKind::LocalPackage => write!(f, "local-package"),
        }
    }
}

/// Where the pack's code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PackSource {
    /// A repository cloned into the marker directory.
    Git { url: String },
    /// Code already reachable on the import path, optionally at a known directory.
    LocalPackage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
}

impl PackSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            PackSource::Git { .. } => SourceKind::Git,
            PackSource::LocalPackage { .. } => SourceKind::LocalPackage,
        }
    }
}

/// The module to import and, optionally, the class to take from it.
///
/// Without a class name the whole module is scanned for a pack-like class
/// whose declared name matches the pack name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTarget {
    pub module_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl ImportTarget {
    pub fn class(module_path: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            class_name: Some(class_name.into()),
        }
    }

    pub fn module(module_path: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            class_name: None,
        }
    }
}

impl fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class_name {
            Some(class) => write!(f, "{}.{}", self.module_path, class),
            None => write!(f, "{}", self.module_path),
        }
    }
}

fn default_arg_type() -> String {
    "any".to_string()
}

/// Declared type and documentation of one pack argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    #[serde(rename = "type", default = "default_arg_type")]
    pub arg_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ArgSpec {
    pub fn new(arg_type: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            arg_type: arg_type.into(),
            description: description.into(),
            required,
        }
    }
}

pub type ArgSchema = BTreeMap<String, ArgSpec>;

/// Canonical description of a pack, as stored in the metadata cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackMetadata {
    pub pack_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    pub source: PackSource,
    pub import_target: ImportTarget,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub run_args: ArgSchema,
    #[serde(default)]
    pub init_args: ArgSchema,
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl PackMetadata {
    pub fn new(
        pack_id: impl Into<String>,
        name: impl Into<String>,
        source: PackSource,
        import_target: ImportTarget,
    ) -> Self {
        Self {
            pack_id: pack_id.into(),
            name: name.into(),
            description: String::new(),
            author: None,
            repo: None,
            source,
            import_target,
            dependencies: Vec::new(),
            run_args: ArgSchema::new(),
            init_args: ArgSchema::new(),
            categories: BTreeSet::new(),
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Author and repository, from the record or from an `author/repo/name` identifier.
    pub fn author_and_repo(&self) -> Option<(String, String)> {
        if let (Some(author), Some(repo)) = (&self.author, &self.repo) {
            return Some((author.clone(), repo.clone()));
        }
        let parts: Vec<&str> = self.pack_id.split('/').collect();
        match parts.as_slice() {
            [author, repo, _name] if !author.is_empty() && !repo.is_empty() => {
                Some((author.to_string(), repo.to_string()))
            }
            _ => None,
        }
    }

    /// Argument signature for display, e.g. `read_file(path: string, encoding?: string)`.
    pub fn signature(&self) -> String {
        let args = self
            .run_args
            .iter()
            .map(|(name, spec)| {
                let marker = if spec.required { "" } else { "?" };
                format!("{}{}: {}", name, marker, spec.arg_type)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.name, args)
    }
}
