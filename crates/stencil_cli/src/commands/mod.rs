//! CLI command definitions.
//!
//! Each subcommand maps to one stage of the template lifecycle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

pub mod build;
pub mod deploy;
pub mod install;
pub mod list;

/// Catalog location below the home directory.
const DEFAULT_TEMPLATE_DIR: &str = ".stencil/templates";

/// stencil - build, install and deploy project templates
#[derive(Parser)]
#[command(name = "stencil")]
#[command(version, about = "stencil - build, install and deploy project templates")]
#[command(long_about = r#"
stencil packages template directories, installs them into a local catalog and
renders them into new projects.

WORKFLOWS:
  build    → Package a template directory into <name>.tar.gz
  install  → Install a package, URL or git repository into the catalog
  list     → Show installed templates
  deploy   → Render an installed template into a directory

EXIT CODES:
  0 - Success
  1 - General error
  2 - Template not found or invalid arguments
  3 - Validation failure
  4 - Template already installed
  5 - Download or clone failure
  6 - Corrupt or unsafe package
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package a template directory
    Build(build::BuildArgs),

    /// Install a template package into the catalog
    Install(install::InstallArgs),

    /// List installed templates
    List(list::ListArgs),

    /// Deploy an installed template
    Deploy(deploy::DeployArgs),
}

/// Catalog root from the flag or env var, defaulting to `~/.stencil/templates`.
pub fn template_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => dirs::home_dir()
            .map(|home| home.join(DEFAULT_TEMPLATE_DIR))
            .context("Could not determine home directory; pass --template-path"),
    }
}

/// Working directory of the process.
pub fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Could not determine current directory")
}
