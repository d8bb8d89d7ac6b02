//! Layered variable resolution for deployments.
//!
//! Variables come from five layers, merged in order with later layers taking
//! precedence. Nested objects are merged key by key, so a user override of
//! `puppet_module.license` leaves `puppet_module.author` in place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{TemplateManifest, TemplateType};

/// Variable map handed to the template engine.
pub type Variables = Map<String, Value>;

/// Identity of the tool performing a deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub build_date: String,
}

impl BuildInfo {
    pub fn new(
        version: impl Into<String>,
        commit: impl Into<String>,
        build_date: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            commit: commit.into(),
            build_date: build_date.into(),
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"), "unknown", "unknown")
    }
}

/// Facts about the machine a deployment runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFacts {
    pub user: String,
    pub hostname: String,
    pub cwd: PathBuf,
}

impl MachineFacts {
    /// Gather facts from the environment, using `cwd` as the working directory.
    pub fn detect(cwd: &Path) -> Self {
        Self {
            user: current_user(),
            hostname: hostname(),
            cwd: cwd.to_path_buf(),
        }
    }
}

/// The five variable layers of a deployment, lowest precedence first.
#[derive(Debug, Clone, Default)]
pub struct VariableLayers {
    pub convention: Variables,
    pub machine: Variables,
    pub build: Variables,
    pub template_defaults: Variables,
    pub user_overrides: Variables,
}

impl VariableLayers {
    /// Build every layer for deploying `manifest` under `name`.
    pub fn resolve(
        manifest: &TemplateManifest,
        name: &str,
        facts: &MachineFacts,
        build_info: &BuildInfo,
        user_config: Option<&Path>,
    ) -> TemplateResult<Self> {
        Ok(Self {
            convention: convention_layer(manifest.template_type(), name, &facts.user),
            machine: machine_layer(facts),
            build: build_layer(build_info),
            template_defaults: manifest.default_variables()?,
            user_overrides: match user_config {
                Some(path) => read_user_config(path)?,
                None => Variables::new(),
            },
        })
    }

    /// Merge all layers into one map.
    pub fn merge(self) -> Variables {
        let mut merged = Value::Object(Variables::new());
        for layer in [
            self.convention,
            self.machine,
            self.build,
            self.template_defaults,
            self.user_overrides,
        ] {
            deep_merge(&mut merged, Value::Object(layer));
        }
        match merged {
            Value::Object(map) => map,
            _ => Variables::new(),
        }
    }
}

/// Merge `overlay` into `base`; objects merge recursively, anything else replaces.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn convention_layer(template_type: TemplateType, name: &str, user: &str) -> Variables {
    let mut vars = Variables::new();
    vars.insert(format!("{}_name", template_type), Value::from(name));
    vars.insert("user".to_string(), Value::from(user));
    vars.insert(
        "puppet_module".to_string(),
        serde_json::json!({ "author": user }),
    );
    vars
}

fn machine_layer(facts: &MachineFacts) -> Variables {
    let mut vars = Variables::new();
    vars.insert(
        "cwd".to_string(),
        Value::from(facts.cwd.to_string_lossy().into_owned()),
    );
    vars.insert("hostname".to_string(), Value::from(facts.hostname.as_str()));
    vars
}

fn build_layer(info: &BuildInfo) -> Variables {
    let mut vars = Variables::new();
    vars.insert(
        "tool".to_string(),
        serde_json::json!({
            "version": info.version,
            "commit": info.commit,
            "build_date": info.build_date,
        }),
    );
    vars
}

/// Read user overrides from a YAML file; a missing file is an empty layer.
pub fn read_user_config(path: &Path) -> TemplateResult<Variables> {
    if !path.exists() {
        debug!("No user configuration at {:?}", path);
        return Ok(Variables::new());
    }

    let config_error = |message: String| TemplateError::Config {
        path: path.to_path_buf(),
        message,
    };

    let content = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
    if content.trim().is_empty() {
        return Ok(Variables::new());
    }

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| config_error(e.to_string()))?;
    match serde_json::to_value(yaml).map_err(|e| config_error(e.to_string()))? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Variables::new()),
        _ => Err(config_error("expected a mapping at the top level".to_string())),
    }
}

fn current_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn hostname() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}
