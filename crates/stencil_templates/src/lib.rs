//! # stencil_templates
//!
//! Template lifecycle for stencil: build a template directory into a package,
//! install packages into a catalog, list what is installed and deploy a
//! template into a working tree.
//!
//! A template is a directory with a `stencil-config.yml` manifest and a
//! `content/` tree. Installed templates live under
//! `<catalog>/<author>/<id>/<version>/`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use stencil_templates::{build, BuildInfo, Deployer, Installer};
//!
//! let catalog = Path::new("/home/me/.stencil/templates");
//!
//! let package = build(Path::new("my-template"), Path::new("pkg")).unwrap();
//! Installer::new().unwrap().install(&package.to_string_lossy(), catalog, false).unwrap();
//!
//! let written = Deployer::new(catalog)
//!     .deploy("me/my-template", None, Some("woo"), &BuildInfo::default())
//!     .unwrap();
//! println!("{} files deployed", written.len());
//! ```

pub mod builder;
pub mod catalog;
pub mod deployer;
pub mod error;
pub mod installer;
pub mod manifest;
pub mod output;
pub mod remote;
pub mod renderer;
pub mod variables;

pub use builder::build;
pub use catalog::{compare_versions, discover, find, list, Selector};
pub use deployer::{Deployer, NAME_PLACEHOLDER, TEMPLATE_SUFFIX};
pub use error::{ErrorKind, TemplateError, TemplateResult};
pub use installer::Installer;
pub use manifest::{
    read_manifest, validate_manifest, TemplateInfo, TemplateManifest, TemplateType, CONTENT_DIR,
    MANIFEST_FILE,
};
pub use output::{format_deployed, format_templates, OutputFormat};
pub use remote::{GitCli, GitClient, HttpFetcher, HttpResponse, ReqwestFetcher};
pub use renderer::TemplateRenderer;
pub use variables::{BuildInfo, Variables};
