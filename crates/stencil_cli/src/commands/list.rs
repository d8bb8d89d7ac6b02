//! List command - Show installed templates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stencil_templates::{format_templates, OutputFormat};

#[derive(Args)]
pub struct ListArgs {
    /// Only show templates with this id
    #[arg(short, long, default_value = "")]
    name: String,

    /// Output format (table or json)
    #[arg(long, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Catalog root
    #[arg(long, env = "STENCIL_TEMPLATE_PATH")]
    template_path: Option<PathBuf>,
}

pub fn execute(args: ListArgs) -> Result<()> {
    let catalog_root = super::template_path(args.template_path)?;

    let templates = stencil_templates::list(&catalog_root, &args.name)
        .with_context(|| format!("Failed to list templates in {}", catalog_root.display()))?;

    println!("{}", format_templates(&templates, args.format)?);
    Ok(())
}
