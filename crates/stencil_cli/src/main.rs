//! stencil CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Template not found or invalid arguments
//! - 3: Validation failure
//! - 4: Template already installed
//! - 5: Download or clone failure
//! - 6: Corrupt or unsafe package

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stencil_templates::{ErrorKind, TemplateError};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const NOT_FOUND: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const CONFLICT: u8 = 4;
    pub const ACQUISITION_ERROR: u8 = 5;
    pub const PACKAGE_ERROR: u8 = 6;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "stencil=debug"
    } else if cli.quiet {
        "error"
    } else {
        "stencil=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", level)));

    // A subscriber may already be installed
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let result = match cli.command {
        Commands::Build(args) => commands::build::execute(args),
        Commands::Install(args) => commands::install::execute(args),
        Commands::List(args) => commands::list::execute(args),
        Commands::Deploy(args) => commands::deploy::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Map the first template error in the chain to an exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let kind = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<TemplateError>())
        .map(TemplateError::kind);

    match kind {
        Some(ErrorKind::NotFound) => ExitCodes::NOT_FOUND,
        Some(ErrorKind::Validation) => ExitCodes::VALIDATION_FAILURE,
        Some(ErrorKind::Conflict) => ExitCodes::CONFLICT,
        Some(ErrorKind::Acquisition) => ExitCodes::ACQUISITION_ERROR,
        Some(ErrorKind::Format) | Some(ErrorKind::Security) => ExitCodes::PACKAGE_ERROR,
        Some(ErrorKind::Render) | Some(ErrorKind::Other) | None => ExitCodes::GENERAL_ERROR,
    }
}
