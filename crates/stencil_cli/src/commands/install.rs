//! Install command - Add a template to the catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use stencil_templates::Installer;

#[derive(Args)]
pub struct InstallArgs {
    /// Package file or http(s) URL of a package
    #[arg(required_unless_present = "git_uri", conflicts_with = "git_uri")]
    package: Option<String>,

    /// Install from a git repository instead of a package
    #[arg(short, long)]
    git_uri: Option<String>,

    /// Replace an already installed copy of the same version
    #[arg(short, long)]
    force: bool,

    /// Catalog root
    #[arg(long, env = "STENCIL_TEMPLATE_PATH")]
    template_path: Option<PathBuf>,
}

pub fn execute(args: InstallArgs) -> Result<()> {
    let catalog_root = super::template_path(args.template_path)?;
    let installer = Installer::new().context("Failed to set up installer")?;

    let installed = match (args.git_uri, args.package) {
        (Some(uri), _) => {
            info!("Installing from git repository {}", uri);
            let scratch = tempfile::Builder::new()
                .prefix("stencil-git-")
                .tempdir()
                .context("Could not create scratch directory")?;
            let result = installer.install_from_git(&uri, &catalog_root, scratch.path(), args.force);
            if let Err(e) = scratch.close() {
                warn!("Failed to clean up scratch directory: {}", e);
            }
            result.with_context(|| format!("Failed to install {}", uri))?
        }
        (None, Some(package)) => installer
            .install(&package, &catalog_root, args.force)
            .with_context(|| format!("Failed to install {}", package))?,
        (None, None) => anyhow::bail!("Nothing to install: pass a package or --git-uri"),
    };

    println!("Installed {}", installed.display());
    Ok(())
}
