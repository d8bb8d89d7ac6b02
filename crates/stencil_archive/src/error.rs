//! Error types for archive operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur while packing, unpacking, compressing or decompressing.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed data in {path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("Archive entry '{entry}' escapes the extraction root {root}")]
    Security { entry: PathBuf, root: PathBuf },
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Format {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is a path-traversal rejection.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security { .. })
    }

    /// Whether this error was caused by malformed input data.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}
