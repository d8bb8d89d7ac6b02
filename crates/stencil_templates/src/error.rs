//! Error types for templates.

use std::path::PathBuf;
use thiserror::Error;

use stencil_archive::ArchiveError;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur during template operations.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("{0}")]
    NotFound(String),

    #[error("The following attributes are missing in {}:\n{}", path.display(), bullet_list(missing))]
    Validation { path: PathBuf, missing: Vec<String> },

    #[error("Template identity in {} must be a single path segment: {}", path.display(), fields.join(", "))]
    UnsafeIdentity { path: PathBuf, fields: Vec<String> },

    #[error("Invalid config: {0}")]
    InvalidConfig(Box<TemplateError>),

    #[error("Could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Could not TAR template ({}): {source}", path.display())]
    Pack {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("Could not GZIP template ({}): {source}", path.display())]
    Compress {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("Could not extract TAR from GZIP ({}): {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("Could not UNTAR template ({}): {source}", path.display())]
    Unpack {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("Template already installed ({})", .0.display())]
    AlreadyInstalled(PathBuf),

    #[error("Unable to force install: {0}")]
    ForceInstall(String),

    #[error("Download failed: HTTP {status} for {url}")]
    DownloadStatus { url: String, status: u16 },

    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("Could not parse git URI ({uri}): {message}")]
    InvalidUri { uri: String, message: String },

    #[error("Could not clone git repository: {0}")]
    Clone(String),

    #[error("Failed to render {}: {message}", path.display())]
    Render { path: PathBuf, message: String },

    #[error("Failed to create {}", .0.display())]
    RenderEmpty(PathBuf),

    #[error("Template selector '{selector}' is ambiguous, candidates: {}", candidates.join(", "))]
    Ambiguous {
        selector: String,
        candidates: Vec<String>,
    },

    #[error("Invalid user configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TemplateError {
    /// Wrap an IO error with a short description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Coarse classification used by callers that map errors to exit codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation { .. } | Self::InvalidConfig(_) | Self::Parse { .. } => {
                ErrorKind::Validation
            }
            Self::Config { .. } => ErrorKind::Validation,
            Self::UnsafeIdentity { .. } => ErrorKind::Security,
            Self::Pack { source, .. }
            | Self::Compress { source, .. }
            | Self::Extract { source, .. }
            | Self::Unpack { source, .. } => {
                if source.is_security() {
                    ErrorKind::Security
                } else {
                    ErrorKind::Format
                }
            }
            Self::AlreadyInstalled(_) | Self::ForceInstall(_) => ErrorKind::Conflict,
            Self::DownloadStatus { .. } | Self::Download { .. } => ErrorKind::Acquisition,
            Self::InvalidUri { .. } | Self::Clone(_) => ErrorKind::Acquisition,
            Self::Render { .. } | Self::RenderEmpty(_) => ErrorKind::Render,
            Self::Ambiguous { .. } => ErrorKind::NotFound,
            Self::Io { .. } | Self::Json(_) => ErrorKind::Other,
        }
    }
}

/// Error categories shared by every pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Format,
    Security,
    Conflict,
    Acquisition,
    Render,
    Other,
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  * {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
