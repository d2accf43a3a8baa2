//! Registry response shapes and their normalization into [`PackMetadata`].
//!
//! The registry has served three record shapes over time. All of them are
//! accepted here so nothing past this module needs to know which one
//! produced a record.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::package::{ArgSchema, ArgSpec, ImportTarget, PackMetadata, PackSource};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireRecord {
    Canonical(PackMetadata),
    Detailed(DetailedRecord),
    Legacy(LegacyRecord),
}

/// `package_path` + `class_name` + `repo_url`.
#[derive(Debug, Deserialize)]
pub struct DetailedRecord {
    pub pack_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub package_path: String,
    pub class_name: String,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub dependencies: WireDependencies,
    #[serde(default)]
    pub run_args: WireArgs,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// `author` + `repo` + `module_path`, loaded by scanning the module.
#[derive(Debug, Deserialize)]
pub struct LegacyRecord {
    pub pack_id: String,
    pub author: String,
    pub repo: String,
    pub module_path: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: WireDependencies,
    #[serde(default = "default_legacy_source")]
    pub source: String,
    #[serde(default)]
    pub run_args: WireArgs,
    #[serde(default)]
    pub init_args: WireArgs,
}

fn default_legacy_source() -> String {
    "git".to_string()
}

/// A list of names, or one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireDependencies {
    List(Vec<String>),
    Joined(String),
}

impl Default for WireDependencies {
    fn default() -> Self {
        WireDependencies::List(Vec::new())
    }
}

impl WireDependencies {
    fn into_vec(self) -> Vec<String> {
        match self {
            WireDependencies::List(list) => list,
            WireDependencies::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NamedArg {
    pub name: String,
    #[serde(flatten)]
    pub spec: ArgSpec,
}

/// Argument schema as a list of named entries or as a map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireArgs {
    List(Vec<NamedArg>),
    Map(serde_json::Map<String, Value>),
}

impl Default for WireArgs {
    fn default() -> Self {
        WireArgs::List(Vec::new())
    }
}

impl WireArgs {
    fn into_schema(self) -> ArgSchema {
        match self {
            WireArgs::List(list) => list.into_iter().map(|arg| (arg.name, arg.spec)).collect(),
            WireArgs::Map(map) => map
                .into_iter()
                .map(|(name, value)| (name, arg_spec_from_value(value)))
                .collect(),
        }
    }
}

/// Map values are either full specs or a bare type name.
fn arg_spec_from_value(value: Value) -> ArgSpec {
    match value {
        Value::String(arg_type) => ArgSpec::new(arg_type, "", false),
        other => serde_json::from_value(other).unwrap_or_else(|_| ArgSpec::new("any", "", false)),
    }
}

impl WireRecord {
    pub fn into_metadata(self) -> PackMetadata {
        match self {
            WireRecord::Canonical(metadata) => metadata,
            WireRecord::Detailed(record) => record.into_metadata(),
            WireRecord::Legacy(record) => record.into_metadata(),
        }
    }
}

impl DetailedRecord {
    fn into_metadata(self) -> PackMetadata {
        let source = if self.repo_url.trim().is_empty() {
            PackSource::LocalPackage { path: None }
        } else {
            PackSource::Git { url: self.repo_url }
        };
        let mut metadata = PackMetadata::new(
            self.pack_id,
            self.name,
            source,
            ImportTarget::class(self.package_path, self.class_name),
        );
        metadata.description = self.description;
        metadata.dependencies = self.dependencies.into_vec();
        metadata.run_args = self.run_args.into_schema();
        metadata.categories = self.categories.into_iter().collect::<BTreeSet<_>>();
        metadata
    }
}

impl LegacyRecord {
    fn into_metadata(self) -> PackMetadata {
        let source = if self.source == "git" {
            PackSource::Git {
                url: format!("https://github.com/{}/{}.git", self.author, self.repo),
            }
        } else {
            PackSource::LocalPackage { path: None }
        };
        let mut metadata = PackMetadata::new(
            self.pack_id,
            self.name,
            source,
            ImportTarget::module(self.module_path),
        );
        metadata.description = self.description;
        metadata.author = Some(self.author);
        metadata.repo = Some(self.repo);
        metadata.dependencies = self.dependencies.into_vec();
        metadata.run_args = self.run_args.into_schema();
        metadata.init_args = self.init_args.into_schema();
        metadata
    }
}

/// Decode one registry record in any supported shape.
pub fn parse_record(value: Value) -> Result<PackMetadata, serde_json::Error> {
    serde_json::from_value::<WireRecord>(value).map(WireRecord::into_metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::SourceKind;
    use serde_json::json;

    #[test]
    fn test_detailed_record() {
        let meta = parse_record(json!({
            "pack_id": "autopack/tests/noop",
            "repo_url": "git@github.com:AutoPackAI/autopack.git",
            "package_path": "tests.data.packs.noop",
            "class_name": "NoopPack",
            "name": "noop_pack",
            "dependencies": "requests, beautifulsoup4",
            "description": "Does nothing",
            "categories": ["Testing"],
            "run_args": [{"name": "query", "type": "string"}]
        }))
        .unwrap();

        assert_eq!(meta.pack_id, "autopack/tests/noop");
        assert_eq!(
            meta.source,
            PackSource::Git {
                url: "git@github.com:AutoPackAI/autopack.git".into()
            }
        );
        assert_eq!(
            meta.import_target,
            ImportTarget::class("tests.data.packs.noop", "NoopPack")
        );
        assert_eq!(meta.dependencies, vec!["requests", "beautifulsoup4"]);
        assert_eq!(meta.run_args["query"].arg_type, "string");
        assert!(meta.categories.contains("Testing"));
    }

    #[test]
    fn test_detailed_record_with_map_args_and_no_repo() {
        let meta = parse_record(json!({
            "pack_id": "a/b/c",
            "package_path": "tools.c",
            "class_name": "C",
            "name": "c",
            "dependencies": [],
            "run_args": {"path": {"type": "string", "required": true}, "limit": "integer"}
        }))
        .unwrap();

        assert_eq!(meta.source_kind(), SourceKind::LocalPackage);
        assert!(meta.run_args["path"].required);
        assert_eq!(meta.run_args["limit"].arg_type, "integer");
    }

    #[test]
    fn test_legacy_record() {
        let meta = parse_record(json!({
            "pack_id": "erik-megarad/tools/web_search",
            "author": "erik-megarad",
            "repo": "tools",
            "module_path": "tools.web_search",
            "description": "Search the web",
            "name": "web_search",
            "dependencies": ["requests"],
            "source": "git",
            "run_args": {"query": {"type": "string", "description": "What to search"}},
            "init_args": {"api_key": {"type": "string"}}
        }))
        .unwrap();

        assert_eq!(
            meta.source,
            PackSource::Git {
                url: "https://github.com/erik-megarad/tools.git".into()
            }
        );
        assert_eq!(meta.import_target, ImportTarget::module("tools.web_search"));
        assert_eq!(meta.author.as_deref(), Some("erik-megarad"));
        assert_eq!(meta.run_args["query"].description, "What to search");
        assert!(meta.init_args.contains_key("api_key"));
    }

    #[test]
    fn test_canonical_record_passes_through() {
        let original = PackMetadata::new(
            "a/b/c",
            "c",
            PackSource::LocalPackage { path: None },
            ImportTarget::module("tools.c"),
        );
        let meta = parse_record(serde_json::to_value(&original).unwrap()).unwrap();
        assert_eq!(meta, original);
    }

    #[test]
    fn test_invalid_record() {
        assert!(parse_record(json!({"pack_id": "a/b/c"})).is_err());
        assert!(parse_record(json!("just a string")).is_err());
    }
}
