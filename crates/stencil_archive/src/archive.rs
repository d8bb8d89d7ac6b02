//! Tar packing and unpacking of directory trees.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{ArchiveError, ArchiveResult};

/// Extension given to packed archives.
pub const ARCHIVE_EXTENSION: &str = "tar";

/// Pack `source_dir` into `<output_dir>/<source base name>.tar`.
///
/// Entry names are relative to the parent of `source_dir`, so the archive has
/// exactly one root entry named after the source directory. Empty directories
/// are preserved.
pub fn pack(source_dir: &Path, output_dir: &Path) -> ArchiveResult<PathBuf> {
    let source_dir = source_dir
        .canonicalize()
        .map_err(|e| ArchiveError::io(source_dir, e))?;

    if !source_dir.is_dir() {
        return Err(ArchiveError::io(
            &source_dir,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    let (base, root_name) = match (source_dir.parent(), source_dir.file_name()) {
        (Some(parent), Some(name)) => (parent.to_path_buf(), name.to_string_lossy().into_owned()),
        _ => {
            return Err(ArchiveError::io(
                &source_dir,
                io::Error::new(io::ErrorKind::InvalidInput, "cannot pack a filesystem root"),
            ))
        }
    };

    let archive_path = output_dir.join(format!("{}.{}", root_name, ARCHIVE_EXTENSION));
    let file = File::create(&archive_path).map_err(|e| ArchiveError::write(&archive_path, e))?;
    let mut builder = tar::Builder::new(BufWriter::new(file));

    info!("Packing {:?} into {:?}", source_dir, archive_path);

    for entry in WalkDir::new(&source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source_dir.clone());
            ArchiveError::io(path, e.into())
        })?;
        let path = entry.path();
        let name = path
            .strip_prefix(&base)
            .map_err(|e| ArchiveError::format(path, e))?;

        if entry.file_type().is_dir() {
            builder
                .append_dir(name, path)
                .map_err(|e| ArchiveError::write(&archive_path, e))?;
        } else if entry.file_type().is_file() {
            let mut source = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
            builder
                .append_file(name, &mut source)
                .map_err(|e| ArchiveError::write(&archive_path, e))?;
        } else {
            debug!("Skipping {:?}: not a regular file or directory", path);
            continue;
        }
        debug!("Packed: {:?}", name);
    }

    let mut writer = builder
        .into_inner()
        .map_err(|e| ArchiveError::write(&archive_path, e))?;
    writer
        .flush()
        .map_err(|e| ArchiveError::write(&archive_path, e))?;

    Ok(archive_path)
}

/// Unpack `archive_path` into `output_dir`.
///
/// Returns `output_dir` joined with the archive's file name up to its first
/// `.`. That path is derived from the archive name, not read from the archive
/// contents, so a renamed package yields a path that may not exist.
pub fn unpack(archive_path: &Path, output_dir: &Path) -> ArchiveResult<PathBuf> {
    let file = File::open(archive_path).map_err(|e| ArchiveError::io(archive_path, e))?;
    fs::create_dir_all(output_dir).map_err(|e| ArchiveError::write(output_dir, e))?;

    info!("Unpacking {:?} into {:?}", archive_path, output_dir);

    let mut archive = tar::Archive::new(BufReader::new(file));
    let entries = archive
        .entries()
        .map_err(|e| ArchiveError::format(archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ArchiveError::format(archive_path, e))?;
        let name = entry
            .path()
            .map_err(|e| ArchiveError::format(archive_path, e))?
            .into_owned();

        ensure_contained(&name, output_dir)?;
        let target = output_dir.join(&name);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ArchiveError::write(&target, e))?;
        } else if entry_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ArchiveError::write(parent, e))?;
            }
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .map_err(|e| ArchiveError::format(archive_path, e))?;
            fs::write(&target, contents).map_err(|e| ArchiveError::write(&target, e))?;
        } else {
            debug!("Skipping archive entry {:?} of type {:?}", name, entry_type);
            continue;
        }
        debug!("Unpacked: {:?}", name);
    }

    Ok(output_dir.join(derived_root_name(archive_path)))
}

/// Reject entry names that could land outside the extraction root.
fn ensure_contained(name: &Path, root: &Path) -> ArchiveResult<()> {
    let escapes = name.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });

    if escapes {
        return Err(ArchiveError::Security {
            entry: name.to_path_buf(),
            root: root.to_path_buf(),
        });
    }
    Ok(())
}

/// File name of `path` up to its first `.`.
fn derived_root_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .unwrap_or_default()
}
