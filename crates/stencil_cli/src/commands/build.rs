//! Build command - Package a template directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

#[derive(Args)]
pub struct BuildArgs {
    /// Template directory (defaults to the current directory)
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Where the package is written (defaults to ./pkg)
    #[arg(short, long)]
    target_dir: Option<PathBuf>,
}

pub fn execute(args: BuildArgs) -> Result<()> {
    let cwd = super::current_dir()?;
    let source_dir = args.source_dir.unwrap_or_else(|| cwd.clone());
    let target_dir = args.target_dir.unwrap_or_else(|| cwd.join("pkg"));

    info!("Building template from {:?}", source_dir);
    let package = stencil_templates::build(&source_dir, &target_dir)
        .with_context(|| format!("Failed to build template in {}", source_dir.display()))?;

    println!("Built {}", package.display());
    Ok(())
}
