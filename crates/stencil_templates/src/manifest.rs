//! Template manifest definitions.
//!
//! A template is a directory holding a `stencil-config.yml` manifest and a
//! `content/` tree. The manifest has a `template:` section carrying the
//! template's identity; every other top-level key is a default variable that
//! becomes available when the template is deployed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::variables::deep_merge;

/// File name of a template manifest.
pub const MANIFEST_FILE: &str = "stencil-config.yml";

/// Manifest key whose mapping is merged into the top level of the defaults.
pub const DEFAULTS_KEY: &str = "defaults";

/// Directory holding a template's renderable tree.
pub const CONTENT_DIR: &str = "content";

/// Template kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    /// A whole new project, deployed into its own directory
    #[default]
    Project,
    /// A piece added to an existing project
    Item,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Project => "project",
            TemplateType::Item => "item",
        }
    }
}

impl std::fmt::Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `template:` section of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TemplateInfo {
    /// Template identifier, unique per author
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: String,
    /// Namespace owner
    #[serde(default, alias = "owner", deserialize_with = "scalar_string")]
    pub author: String,
    /// Template version
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: String,
    /// Template kind
    #[serde(default, rename = "type")]
    pub template_type: TemplateType,
    /// Display name
    #[serde(default, deserialize_with = "scalar_string")]
    pub display: String,
    /// Source URL
    #[serde(default, deserialize_with = "scalar_string")]
    pub url: String,
}

/// Accept any YAML scalar as a string; `~` and empty values become `""`.
///
/// Lets `version: 1.0` parse even though YAML reads it as a float.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(String::new()),
        Some(serde_yaml::Value::String(s)) => Ok(s),
        Some(serde_yaml::Value::Number(n)) => Ok(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(D::Error::custom(format!(
            "expected a scalar value, found {:?}",
            other
        ))),
    }
}

/// A parsed `stencil-config.yml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TemplateManifest {
    #[serde(default)]
    pub template: TemplateInfo,

    /// Template-declared default variables (every sibling of `template`).
    #[serde(flatten)]
    pub defaults: BTreeMap<String, serde_yaml::Value>,

    /// Directory the manifest was read from.
    #[serde(skip)]
    pub path: PathBuf,
}

impl TemplateManifest {
    /// Parse a manifest from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn id(&self) -> &str {
        &self.template.id
    }

    pub fn author(&self) -> &str {
        &self.template.author
    }

    pub fn version(&self) -> &str {
        &self.template.version
    }

    pub fn template_type(&self) -> TemplateType {
        self.template.template_type
    }

    /// `author/id`, the string used to select this template.
    pub fn selector(&self) -> String {
        format!("{}/{}", self.template.author, self.template.id)
    }

    /// Required identity fields that are empty, in reporting order.
    pub fn missing_fields(&self) -> Vec<String> {
        [
            ("id", &self.template.id),
            ("author", &self.template.author),
            ("version", &self.template.version),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect()
    }

    /// Identity fields that cannot be used as a single catalog path segment.
    ///
    /// Blank fields are left to [`missing_fields`](Self::missing_fields).
    pub fn unsafe_fields(&self) -> Vec<String> {
        [
            ("id", &self.template.id),
            ("author", &self.template.author),
            ("version", &self.template.version),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty() && !is_path_segment(value))
        .map(|(name, _)| name.to_string())
        .collect()
    }

    /// Catalog location of this template: `<root>/<author>/<id>/<version>`.
    pub fn namespace_path(&self, catalog_root: &Path) -> PathBuf {
        catalog_root
            .join(&self.template.author)
            .join(&self.template.id)
            .join(&self.template.version)
    }

    /// The template's `content/` directory.
    pub fn content_dir(&self) -> PathBuf {
        self.path.join(CONTENT_DIR)
    }

    /// Manifest defaults converted for the template engine.
    ///
    /// Keys of an explicit `defaults:` mapping are lifted to the top level and
    /// merged over the other sibling keys.
    pub fn default_variables(&self) -> TemplateResult<serde_json::Map<String, serde_json::Value>> {
        let mut siblings = serde_json::Map::new();
        let mut block = None;
        for (key, value) in &self.defaults {
            match serde_json::to_value(value)? {
                value @ serde_json::Value::Object(_) if key == DEFAULTS_KEY => block = Some(value),
                value => {
                    siblings.insert(key.clone(), value);
                }
            }
        }

        let mut vars = serde_json::Value::Object(siblings);
        if let Some(block) = block {
            deep_merge(&mut vars, block);
        }
        match vars {
            serde_json::Value::Object(map) => Ok(map),
            _ => Ok(serde_json::Map::new()),
        }
    }
}

/// Whether `value` names exactly one ordinary path component.
fn is_path_segment(value: &str) -> bool {
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return false;
    }
    let path = Path::new(value);
    !path.is_absolute()
        && matches!(
            path.components().collect::<Vec<_>>().as_slice(),
            [std::path::Component::Normal(_)]
        )
}

/// Read and parse the manifest at `path`.
///
/// The returned manifest remembers the directory containing `path`.
pub fn read_manifest(path: &Path) -> TemplateResult<TemplateManifest> {
    debug!("Loading manifest from {:?}", path);
    let content = fs::read_to_string(path)
        .map_err(|e| TemplateError::io(format!("Could not read {}", path.display()), e))?;

    let mut manifest = TemplateManifest::from_yaml(&content).map_err(|source| TemplateError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    manifest.path = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(manifest)
}

/// Read the manifest at `path` and check that its identity fields are set.
///
/// Every missing field is reported in a single error. Fields that would not
/// map to a single directory below the catalog root are rejected as unsafe.
pub fn validate_manifest(path: &Path) -> TemplateResult<TemplateManifest> {
    let manifest = read_manifest(path)?;
    let missing = manifest.missing_fields();
    if !missing.is_empty() {
        return Err(TemplateError::Validation {
            path: path.to_path_buf(),
            missing,
        });
    }
    let fields = manifest.unsafe_fields();
    if !fields.is_empty() {
        return Err(TemplateError::UnsafeIdentity {
            path: path.to_path_buf(),
            fields,
        });
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const GOOD: &str = r#"
template:
  id: good-project
  author: gooder
  type: project
  display: Good Project
  version: 0.1.0
  url: https://example.com/good-project

puppet_module:
  license: Apache-2.0
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = TemplateManifest::from_yaml(GOOD).unwrap();
        assert_eq!(manifest.id(), "good-project");
        assert_eq!(manifest.author(), "gooder");
        assert_eq!(manifest.version(), "0.1.0");
        assert_eq!(manifest.template_type(), TemplateType::Project);
        assert_eq!(manifest.template.display, "Good Project");
        assert!(manifest.defaults.contains_key("puppet_module"));
        assert!(!manifest.defaults.contains_key("template"));
    }

    #[test]
    fn test_owner_alias_and_item_type() {
        let manifest = TemplateManifest::from_yaml(
            "template:\n  id: thing\n  owner: acme\n  version: 1.0.0\n  type: item\n",
        )
        .unwrap();
        assert_eq!(manifest.author(), "acme");
        assert_eq!(manifest.template_type(), TemplateType::Item);
    }

    #[test]
    fn test_blank_fields_are_empty() {
        let manifest =
            TemplateManifest::from_yaml("template:\n  id: thing\n  author:\n  version: ~\n").unwrap();
        assert_eq!(manifest.missing_fields(), vec!["author", "version"]);
    }

    #[test]
    fn test_numeric_version_is_accepted() {
        let manifest =
            TemplateManifest::from_yaml("template:\n  id: thing\n  author: a\n  version: 1.0\n").unwrap();
        assert_eq!(manifest.version(), "1.0");
    }

    #[test]
    fn test_namespace_path() {
        let manifest = TemplateManifest::from_yaml(GOOD).unwrap();
        assert_eq!(
            manifest.namespace_path(Path::new("/catalog")),
            PathBuf::from("/catalog/gooder/good-project/0.1.0")
        );
    }

    #[test]
    fn test_default_variables_are_nested_json() {
        let manifest = TemplateManifest::from_yaml(GOOD).unwrap();
        let vars = manifest.default_variables().unwrap();
        assert_eq!(vars["puppet_module"]["license"], "Apache-2.0");
    }

    #[test]
    fn test_defaults_block_is_lifted() {
        let manifest = TemplateManifest::from_yaml(
            "template:\n  id: t\n  author: a\n  version: '1'\n\
             license: Apache-2.0\n\
             puppet_module:\n  author: me\n\
             defaults:\n  license: MIT\n  puppet_module:\n    source: git\n",
        )
        .unwrap();

        let vars = manifest.default_variables().unwrap();
        assert_eq!(vars["license"], "MIT");
        assert_eq!(vars["puppet_module"]["author"], "me");
        assert_eq!(vars["puppet_module"]["source"], "git");
        assert!(!vars.contains_key("defaults"));
    }

    #[test]
    fn test_validate_reports_all_missing_fields_once() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        fs::write(&path, "template:\n  author: someone\n  display: Nothing\n").unwrap();

        let err = validate_manifest(&path).unwrap_err();
        let message = err.to_string();

        match &err {
            TemplateError::Validation { missing, .. } => {
                assert_eq!(missing, &vec!["id".to_string(), "version".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(message.contains(&path.display().to_string()));
        assert!(message.contains("  * id\n  * version"));
        assert!(!message.contains("author"));
    }

    #[test]
    fn test_validate_sets_manifest_dir() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        fs::write(&path, GOOD).unwrap();

        let manifest = validate_manifest(&path).unwrap();
        assert_eq!(manifest.path, temp.path());
        assert_eq!(manifest.content_dir(), temp.path().join(CONTENT_DIR));
    }

    #[test]
    fn test_identity_must_be_a_single_segment() {
        let manifest = |author: &str, id: &str, version: &str| {
            TemplateManifest::from_yaml(&format!(
                "template:\n  id: '{id}'\n  author: '{author}'\n  version: '{version}'\n"
            ))
            .unwrap()
        };

        assert!(manifest("gooder", "good-project", "0.1.0").unsafe_fields().is_empty());
        assert!(manifest("gooder", "good.project", "1.0.0-rc.1").unsafe_fields().is_empty());
        assert_eq!(manifest("../victim", "keep", "me").unsafe_fields(), vec!["author"]);
        assert_eq!(manifest("/tmp/outside", "..", "1.0").unsafe_fields(), vec!["id", "author"]);
        assert_eq!(manifest("a", "b", ".").unsafe_fields(), vec!["version"]);
        assert_eq!(manifest("a\\b", "b", "1").unsafe_fields(), vec!["author"]);
    }

    #[test]
    fn test_validate_rejects_traversal() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        fs::write(&path, "template:\n  id: keep\n  author: ../victim\n  version: me\n").unwrap();

        let err = validate_manifest(&path).unwrap_err();
        assert!(matches!(&err, TemplateError::UnsafeIdentity { fields, .. } if fields == &vec!["author".to_string()]));
        assert_eq!(err.kind(), crate::error::ErrorKind::Security);
    }

    #[test]
    fn test_parse_error_is_surfaced() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        fs::write(&path, "template: [unterminated").unwrap();

        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }
}
