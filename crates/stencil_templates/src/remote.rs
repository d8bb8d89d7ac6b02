//! Network and VCS capabilities used by the installer.
//!
//! Both are narrow traits so tests can swap in fakes that never touch the
//! network or spawn processes.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{TemplateError, TemplateResult};

const USER_AGENT: &str = concat!("stencil/", env!("CARGO_PKG_VERSION"));
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Response returned by an [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches a URL.
pub trait HttpFetcher: Send + Sync {
    /// Issue a GET request; transport failures are errors, HTTP error statuses are not.
    fn get(&self, url: &str) -> TemplateResult<HttpResponse>;
}

/// Clones a git repository.
pub trait GitClient: Send + Sync {
    /// Clone `uri` into `dest`, which must not exist yet.
    fn clone_repo(&self, uri: &str, dest: &Path) -> TemplateResult<()>;
}

/// [`HttpFetcher`] backed by a blocking reqwest client.
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new() -> TemplateResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| TemplateError::Download {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn get(&self, url: &str) -> TemplateResult<HttpResponse> {
        info!("Downloading {}", url);
        let download_error = |e: reqwest::Error| TemplateError::Download {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(download_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(download_error)?;
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// [`GitClient`] that shells out to the `git` binary.
#[derive(Debug, Default, Clone)]
pub struct GitCli {
    program: Option<String>,
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable instead of `git` from `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self) -> &str {
        self.program.as_deref().unwrap_or("git")
    }
}

impl GitClient for GitCli {
    fn clone_repo(&self, uri: &str, dest: &Path) -> TemplateResult<()> {
        info!("Cloning {} into {}", uri, dest.display());

        let output = Command::new(self.program())
            .arg("clone")
            .arg(uri)
            .arg(dest)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TemplateError::Clone(format!("git not found ({})", self.program()))
                } else {
                    TemplateError::Clone(format!("failed to run git clone: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TemplateError::Clone(stderr.trim().to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
    }

    #[test]
    fn test_missing_git_binary_is_clone_error() {
        let temp = tempdir().unwrap();
        let git = GitCli::with_program("definitely-not-a-real-git-binary");

        let err = git
            .clone_repo("https://example.com/repo.git", &temp.path().join("repo"))
            .unwrap_err();

        assert!(matches!(err, TemplateError::Clone(_)));
        assert!(err.to_string().contains("git not found"));
    }
}
