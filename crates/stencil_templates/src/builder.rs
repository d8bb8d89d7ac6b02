//! Template package building.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{TemplateError, TemplateResult};
use crate::manifest::{validate_manifest, CONTENT_DIR, MANIFEST_FILE};

/// Package the template at `source_dir` into `<output_dir>/<dir name>.tar.gz`.
///
/// The source is checked before anything is written: the directory, its
/// manifest, the manifest's identity fields and the `content/` directory must
/// all be present.
pub fn build(source_dir: &Path, output_dir: &Path) -> TemplateResult<PathBuf> {
    if !source_dir.is_dir() {
        return Err(TemplateError::NotFound(format!(
            "No template directory at {}",
            source_dir.display()
        )));
    }

    let manifest_path = source_dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(TemplateError::NotFound(format!(
            "No '{}' found in {}",
            MANIFEST_FILE,
            source_dir.display()
        )));
    }

    let manifest = validate_manifest(&manifest_path)
        .map_err(|e| TemplateError::InvalidConfig(Box::new(e)))?;

    if !source_dir.join(CONTENT_DIR).is_dir() {
        return Err(TemplateError::NotFound(format!(
            "No '{}' dir found in {}",
            CONTENT_DIR,
            source_dir.display()
        )));
    }

    info!(
        "Building {} {} from {:?}",
        manifest.selector(),
        manifest.version(),
        source_dir
    );

    let scratch = tempfile::Builder::new()
        .prefix("stencil-build-")
        .tempdir()
        .map_err(|e| TemplateError::io("Could not create scratch directory", e))?;

    let result = package(source_dir, scratch.path(), output_dir);

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!("Failed to clean up {:?}: {}", scratch_path, e);
    }

    let package_path = result?;
    info!("Built package {:?}", package_path);
    Ok(package_path)
}

fn package(source_dir: &Path, scratch: &Path, output_dir: &Path) -> TemplateResult<PathBuf> {
    let archive = stencil_archive::pack(source_dir, scratch).map_err(|source| TemplateError::Pack {
        path: source_dir.to_path_buf(),
        source,
    })?;

    fs::create_dir_all(output_dir)
        .map_err(|e| TemplateError::io(format!("Could not create {}", output_dir.display()), e))?;

    stencil_archive::compress(&archive, output_dir).map_err(|source| TemplateError::Compress {
        path: archive.clone(),
        source,
    })
}
