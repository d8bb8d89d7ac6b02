//! Template package installation.
//!
//! Packages are acquired from a local path, an HTTP(S) URL or a git remote,
//! extracted into scratch space and moved into the catalog under
//! `<root>/<author>/<id>/<version>`.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{validate_manifest, MANIFEST_FILE};
use crate::remote::{GitCli, GitClient, HttpFetcher, ReqwestFetcher};

/// Name given to downloads whose URL has no usable file name.
const DEFAULT_DOWNLOAD_NAME: &str = "template.tar.gz";

/// Installs template packages into a catalog.
pub struct Installer {
    fetcher: Box<dyn HttpFetcher>,
    git: Box<dyn GitClient>,
}

impl Installer {
    /// Create an installer using reqwest for downloads and the `git` binary for clones.
    pub fn new() -> TemplateResult<Self> {
        Ok(Self {
            fetcher: Box::new(ReqwestFetcher::new()?),
            git: Box::new(GitCli::new()),
        })
    }

    /// Create an installer from explicit capabilities.
    pub fn with_capabilities(fetcher: Box<dyn HttpFetcher>, git: Box<dyn GitClient>) -> Self {
        Self { fetcher, git }
    }

    /// Install a package from a local path or an HTTP(S) URL.
    pub fn install(&self, locator: &str, catalog_root: &Path, force: bool) -> TemplateResult<PathBuf> {
        let download_dir = scratch_dir()?;
        let result = self
            .acquire(locator, download_dir.path())
            .and_then(|package| install_package(&package, catalog_root, force));
        cleanup(download_dir);
        result
    }

    /// Clone a git repository and install it as a template.
    ///
    /// The clone is made under `scratch_dir` and its `.git` directory is
    /// removed before the tree is moved into the catalog.
    pub fn install_from_git(
        &self,
        uri: &str,
        catalog_root: &Path,
        scratch_dir: &Path,
        force: bool,
    ) -> TemplateResult<PathBuf> {
        let url = Url::parse(uri).map_err(|e| TemplateError::InvalidUri {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;

        fs::create_dir_all(scratch_dir).map_err(|e| {
            TemplateError::io(format!("Could not create {}", scratch_dir.display()), e)
        })?;
        let clone_dir = scratch_dir.join(repository_name(&url));
        if clone_dir.exists() {
            fs::remove_dir_all(&clone_dir).map_err(|e| {
                TemplateError::io(format!("Could not clear {}", clone_dir.display()), e)
            })?;
        }

        self.git.clone_repo(uri, &clone_dir)?;

        let result =
            strip_history(&clone_dir).and_then(|()| namespace(&clone_dir, catalog_root, force));
        if clone_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&clone_dir) {
                warn!("Failed to clean up {:?}: {}", clone_dir, e);
            }
        }
        result
    }

    /// Resolve `locator` to a package file on disk, downloading it if needed.
    fn acquire(&self, locator: &str, download_dir: &Path) -> TemplateResult<PathBuf> {
        if let Some(url) = remote_url(locator) {
            return self.download(&url, download_dir);
        }

        let path = PathBuf::from(locator);
        if !path.exists() {
            return Err(TemplateError::NotFound(format!(
                "No template package at {}",
                path.display()
            )));
        }
        Ok(path)
    }

    fn download(&self, url: &Url, dest_dir: &Path) -> TemplateResult<PathBuf> {
        let response = self.fetcher.get(url.as_str())?;
        if !response.is_success() {
            return Err(TemplateError::DownloadStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DOWNLOAD_NAME);
        let path = dest_dir.join(file_name);

        fs::write(&path, &response.body)
            .map_err(|e| TemplateError::io(format!("Could not write {}", path.display()), e))?;
        debug!("Downloaded {} bytes to {:?}", response.body.len(), path);
        Ok(path)
    }
}

/// Remove the `.git` directory of a fresh clone.
fn strip_history(clone_dir: &Path) -> TemplateResult<()> {
    let git_dir = clone_dir.join(".git");
    if git_dir.exists() {
        fs::remove_dir_all(&git_dir).map_err(|e| {
            TemplateError::io(format!("Could not remove {}", git_dir.display()), e)
        })?;
    }
    Ok(())
}

/// Decompress, unpack and namespace a local package file.
fn install_package(package: &Path, catalog_root: &Path, force: bool) -> TemplateResult<PathBuf> {
    info!("Installing {:?} into {:?}", package, catalog_root);

    let extract_dir = scratch_dir()?;
    let result = stencil_archive::decompress(package, extract_dir.path())
        .map_err(|source| TemplateError::Extract {
            path: package.to_path_buf(),
            source,
        })
        .and_then(|tar| {
            stencil_archive::unpack(&tar, &extract_dir.path().join("tree")).map_err(|source| {
                TemplateError::Unpack {
                    path: tar.clone(),
                    source,
                }
            })
        })
        .and_then(|root| namespace(&root, catalog_root, force));

    cleanup(extract_dir);
    result
}

/// Move an extracted template tree to its catalog location.
fn namespace(root: &Path, catalog_root: &Path, force: bool) -> TemplateResult<PathBuf> {
    let manifest = validate_manifest(&root.join(MANIFEST_FILE))?;
    let target = manifest.namespace_path(catalog_root);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| TemplateError::io(format!("Could not create {}", parent.display()), e))?;
    }

    if target.exists() {
        if !force {
            return Err(TemplateError::AlreadyInstalled(target));
        }
        info!("Replacing existing installation at {:?}", target);
        fs::remove_dir_all(&target).map_err(|e| TemplateError::ForceInstall(e.to_string()))?;
        move_tree(root, &target).map_err(|e| TemplateError::ForceInstall(e.to_string()))?;
    } else {
        move_tree(root, &target)?;
    }

    info!("Installed {} {} to {:?}", manifest.selector(), manifest.version(), target);
    Ok(target)
}

/// Rename `from` to `to`, falling back to a recursive move across filesystems.
fn move_tree(from: &Path, to: &Path) -> TemplateResult<()> {
    let move_error = |detail: String| {
        TemplateError::io(
            format!("Could not move {} to {}", from.display(), to.display()),
            std::io::Error::new(std::io::ErrorKind::Other, detail),
        )
    };

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!("rename failed ({}), copying {:?} instead", rename_err, from);
            fs::create_dir_all(to).map_err(|e| move_error(e.to_string()))?;
            let mut options = fs_extra::dir::CopyOptions::new();
            options.content_only = true;
            fs_extra::dir::move_dir(from, to, &options).map_err(|e| {
                if let Err(cleanup_err) = fs::remove_dir_all(to) {
                    warn!("Failed to clean up partial move {:?}: {}", to, cleanup_err);
                }
                move_error(e.to_string())
            })?;
            Ok(())
        }
    }
}

/// The locator as a URL when it uses an HTTP scheme.
fn remote_url(locator: &str) -> Option<Url> {
    Url::parse(locator)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Last path segment of a repository URL without its `.git` suffix.
fn repository_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|name| name.trim_end_matches(".git").to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "template".to_string())
}

fn scratch_dir() -> TemplateResult<TempDir> {
    tempfile::Builder::new()
        .prefix("stencil-")
        .tempdir()
        .map_err(|e| TemplateError::io("Could not create scratch directory", e))
}

fn cleanup(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(e) = dir.close() {
        warn!("Failed to clean up {:?}: {}", path, e);
    }
}
