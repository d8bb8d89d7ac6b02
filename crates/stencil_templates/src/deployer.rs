//! Template deployment.
//!
//! Deploying renders an installed template's `content/` tree into a target
//! directory. Path components containing [`NAME_PLACEHOLDER`] get the
//! instance name and file names lose a trailing [`TEMPLATE_SUFFIX`]. Every
//! text file is rendered; files that are not UTF-8 are copied as-is.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog;
use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{TemplateManifest, TemplateType};
use crate::renderer::TemplateRenderer;
use crate::variables::{BuildInfo, MachineFacts, VariableLayers, Variables};

/// Token in file and directory names replaced by the instance name.
pub const NAME_PLACEHOLDER: &str = "__REPLACE__";

/// Suffix stripped from deployed file names.
pub const TEMPLATE_SUFFIX: &str = ".tmpl";

/// Location of the user override file relative to the home directory.
pub const USER_CONFIG_FILE: &str = ".stencil/stencil.yml";

/// One entry of a deployment walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub source: PathBuf,
    pub target: PathBuf,
    pub is_dir: bool,
}

/// Resolve the output directory and instance name for a deployment.
///
/// Missing values default to `cwd` and its base name. Projects deploy into a
/// directory named after the instance; items deploy next to it.
pub fn resolve_target(
    cwd: &Path,
    output: Option<&Path>,
    name: Option<&str>,
    template_type: TemplateType,
) -> (PathBuf, String) {
    let base_name = |path: &Path| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let (mut output, name) = match (name, output) {
        (None, None) => (cwd.to_path_buf(), base_name(cwd)),
        (Some(name), None) => (cwd.join(name), name.to_string()),
        (None, Some(output)) => (output.to_path_buf(), base_name(output)),
        (Some(name), Some(output)) => (output.to_path_buf(), name.to_string()),
    };

    match template_type {
        TemplateType::Project => {
            if !output.ends_with(&name) {
                output = output.join(&name);
            }
        }
        TemplateType::Item => {
            if output.ends_with(&name) {
                if let Some(parent) = output.parent() {
                    output = parent.to_path_buf();
                }
            }
        }
    }

    (output, name)
}

/// Compute the target path of `source`, relative to `content_dir`, inside `output`.
///
/// The suffix is only stripped from files; directories keep their names.
pub fn target_path(
    content_dir: &Path,
    source: &Path,
    output: &Path,
    name: &str,
    is_dir: bool,
) -> PathBuf {
    let relative = source.strip_prefix(content_dir).unwrap_or(source);
    let mut target = output.to_path_buf();
    for component in relative.components() {
        target.push(component.as_os_str().to_string_lossy().replace(NAME_PLACEHOLDER, name));
    }
    if is_dir {
        return target;
    }

    let stripped = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .and_then(|n| n.strip_suffix(TEMPLATE_SUFFIX).map(str::to_string))
        .filter(|n| !n.is_empty());
    if let Some(stripped) = stripped {
        target.set_file_name(stripped);
    }
    target
}

/// Deploys installed templates.
pub struct Deployer {
    catalog_root: PathBuf,
    working_dir: Option<PathBuf>,
    user_config: Option<PathBuf>,
    renderer: TemplateRenderer,
}

impl Deployer {
    /// Create a deployer for templates installed under `catalog_root`.
    ///
    /// Uses the process working directory and `~/.stencil/stencil.yml` unless
    /// overridden.
    pub fn new(catalog_root: impl Into<PathBuf>) -> Self {
        Self {
            catalog_root: catalog_root.into(),
            working_dir: None,
            user_config: dirs::home_dir().map(|home| home.join(USER_CONFIG_FILE)),
            renderer: TemplateRenderer::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Read user overrides from `path`; `None` disables the layer.
    pub fn with_user_config(mut self, path: Option<PathBuf>) -> Self {
        self.user_config = path;
        self
    }

    /// Deploy the template named by `selector`, returning every file written.
    ///
    /// A file that fails to render or write is logged and left out; the rest
    /// of the tree is still deployed.
    pub fn deploy(
        &self,
        selector: &str,
        output: Option<&Path>,
        name: Option<&str>,
        build_info: &BuildInfo,
    ) -> TemplateResult<Vec<PathBuf>> {
        let manifest = catalog::find(&self.catalog_root, selector)?;
        self.deploy_manifest(&manifest, output, name, build_info)
    }

    /// Deploy an already-loaded template.
    pub fn deploy_manifest(
        &self,
        manifest: &TemplateManifest,
        output: Option<&Path>,
        name: Option<&str>,
        build_info: &BuildInfo,
    ) -> TemplateResult<Vec<PathBuf>> {
        let cwd = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .map_err(|e| TemplateError::io("Could not determine working directory", e))?,
        };
        let (output, name) = resolve_target(&cwd, output, name, manifest.template_type());

        let content_dir = manifest.content_dir();
        if !content_dir.is_dir() {
            return Err(TemplateError::NotFound(format!(
                "No 'content' dir found in {}",
                manifest.path.display()
            )));
        }

        info!(
            "Deploying {} {} as '{}' into {:?}",
            manifest.selector(),
            manifest.version(),
            name,
            output
        );

        let facts = MachineFacts::detect(&cwd);
        let variables = VariableLayers::resolve(
            manifest,
            &name,
            &facts,
            build_info,
            self.user_config.as_deref(),
        )?
        .merge();

        fs::create_dir_all(&output)
            .map_err(|e| TemplateError::io(format!("Could not create {}", output.display()), e))?;

        let mut deployed = Vec::new();
        for file in self.walk(&content_dir, &output, &name)? {
            if file.is_dir {
                fs::create_dir_all(&file.target).map_err(|e| {
                    TemplateError::io(format!("Could not create {}", file.target.display()), e)
                })?;
                continue;
            }

            match self.write_file(&file, &variables) {
                Ok(()) => {
                    debug!("Deployed: {:?}", file.target);
                    deployed.push(file.target);
                }
                Err(e) => warn!("{}", e),
            }
        }

        info!("Deployed {} files", deployed.len());
        Ok(deployed)
    }

    fn walk(&self, content_dir: &Path, output: &Path, name: &str) -> TemplateResult<Vec<TemplateFile>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(content_dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                TemplateError::io(format!("Could not read {}", content_dir.display()), e.into())
            })?;
            let is_dir = entry.file_type().is_dir();
            files.push(TemplateFile {
                source: entry.path().to_path_buf(),
                target: target_path(content_dir, entry.path(), output, name, is_dir),
                is_dir,
            });
        }
        Ok(files)
    }

    fn write_file(&self, file: &TemplateFile, variables: &Variables) -> TemplateResult<()> {
        if let Some(parent) = file.target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| TemplateError::io(format!("Could not create {}", parent.display()), e))?;
        }

        let bytes = fs::read(&file.source).map_err(|e| {
            TemplateError::io(format!("Could not read {}", file.source.display()), e)
        })?;
        let contents = match String::from_utf8(bytes) {
            Ok(text) => self
                .renderer
                .render_source(&text, &file.source, &file.target, variables)?
                .into_bytes(),
            Err(binary) => {
                debug!("Copying non-UTF-8 file {:?} unrendered", file.source);
                binary.into_bytes()
            }
        };
        fs::write(&file.target, contents).map_err(|e| TemplateError::io(format!("Failed to create {}", file.target.display()), e))
    }
}
