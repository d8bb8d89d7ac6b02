//! Deploy command - Render an installed template.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stencil_templates::{format_deployed, BuildInfo, Deployer, OutputFormat};

#[derive(Args)]
pub struct DeployArgs {
    /// Template to deploy, as [author/]id[@version]
    pub template: String,

    /// Instance name (defaults to the output directory's name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Output directory (defaults to the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (table or json)
    #[arg(long, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Catalog root
    #[arg(long, env = "STENCIL_TEMPLATE_PATH")]
    pub template_path: Option<PathBuf>,
}

pub fn execute(args: DeployArgs) -> Result<()> {
    let catalog_root = super::template_path(args.template_path)?;
    let deployer = Deployer::new(&catalog_root).with_working_dir(super::current_dir()?);

    info!("Deploying {}", args.template);
    let deployed = deployer
        .deploy(
            &args.template,
            args.output.as_deref(),
            args.name.as_deref(),
            &build_info(),
        )
        .with_context(|| format!("Failed to deploy {}", args.template))?;

    println!("{}", format_deployed(&deployed, args.format)?);
    Ok(())
}

/// Identity of this binary, stamped in at compile time when available.
fn build_info() -> BuildInfo {
    BuildInfo::new(
        env!("CARGO_PKG_VERSION"),
        option_env!("STENCIL_COMMIT").unwrap_or("unknown"),
        option_env!("STENCIL_BUILD_DATE").unwrap_or("unknown"),
    )
}
