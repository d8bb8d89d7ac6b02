//! Gzip wrapper around a single file.
//!
//! The original file name is stored in the gzip header so that
//! [`decompress`] can restore it.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use tracing::{debug, info};

use crate::error::{ArchiveError, ArchiveResult};

/// Extension appended to compressed files.
pub const COMPRESSED_EXTENSION: &str = "gz";

/// Compress `input` into `<output_dir>/<input name>.gz`.
pub fn compress(input: &Path, output_dir: &Path) -> ArchiveResult<PathBuf> {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ArchiveError::io(
                input,
                io::Error::new(io::ErrorKind::InvalidInput, "input has no file name"),
            )
        })?;

    let mut source = BufReader::new(File::open(input).map_err(|e| ArchiveError::io(input, e))?);
    let output = output_dir.join(format!("{}.{}", file_name, COMPRESSED_EXTENSION));
    let sink = File::create(&output).map_err(|e| ArchiveError::write(&output, e))?;

    info!("Compressing {:?} into {:?}", input, output);

    let mut encoder = GzBuilder::new()
        .filename(file_name)
        .write(BufWriter::new(sink), Compression::default());

    io::copy(&mut source, &mut encoder).map_err(|e| ArchiveError::write(&output, e))?;
    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .map_err(|e| ArchiveError::write(&output, e))?;

    Ok(output)
}

/// Decompress `input` into `output_dir`, restoring the file name recorded in
/// the gzip header.
///
/// Falls back to the input name without its `.gz` extension when the header
/// carries no name. Nothing is left in `output_dir` when the stream is
/// malformed.
pub fn decompress(input: &Path, output_dir: &Path) -> ArchiveResult<PathBuf> {
    let file = File::open(input).map_err(|e| ArchiveError::io(input, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut staging =
        tempfile::NamedTempFile::new_in(output_dir).map_err(|e| ArchiveError::write(output_dir, e))?;

    info!("Decompressing {:?} into {:?}", input, output_dir);

    let mut buffer = [0u8; 8192];
    loop {
        let read = decoder
            .read(&mut buffer)
            .map_err(|e| ArchiveError::format(input, e))?;
        if read == 0 {
            break;
        }
        staging
            .write_all(&buffer[..read])
            .map_err(|e| ArchiveError::write(staging.path(), e))?;
    }

    let header = decoder
        .header()
        .ok_or_else(|| ArchiveError::format(input, "missing gzip header"))?;

    let recorded = header
        .filename()
        .map(|raw| String::from_utf8_lossy(raw).into_owned())
        .and_then(|name| {
            // Only the final component is trusted.
            Path::new(&name)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        });

    let name = match recorded {
        Some(name) => name,
        None => fallback_name(input),
    };
    debug!("Recovered file name {:?}", name);

    let output = output_dir.join(name);
    staging
        .persist(&output)
        .map_err(|e| ArchiveError::write(&output, e.error))?;

    Ok(output)
}

fn fallback_name(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(&format!(".{}", COMPRESSED_EXTENSION)) {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => format!("{}.out", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_compress_round_trip_restores_name() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("good-project.tar");
        fs::write(&input, b"some archive bytes").unwrap();

        let packed_dir = temp.path().join("packed");
        fs::create_dir_all(&packed_dir).unwrap();
        let compressed = compress(&input, &packed_dir).unwrap();
        assert_eq!(compressed, packed_dir.join("good-project.tar.gz"));

        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let restored = decompress(&compressed, &out).unwrap();
        assert_eq!(restored, out.join("good-project.tar"));
        assert_eq!(fs::read(&restored).unwrap(), b"some archive bytes");
    }

    #[test]
    fn test_decompress_uses_header_name_over_file_name() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("original.tar");
        fs::write(&input, b"data").unwrap();
        let compressed = compress(&input, temp.path()).unwrap();

        let renamed = temp.path().join("renamed.bin");
        fs::rename(&compressed, &renamed).unwrap();

        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        assert_eq!(decompress(&renamed, &out).unwrap(), out.join("original.tar"));
    }

    #[test]
    fn test_decompress_malformed_input() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("broken.tar.gz");
        fs::write(&input, b"this is definitely not gzip").unwrap();

        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let err = decompress(&input, &out).unwrap_err();
        assert!(err.is_format());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(fallback_name(Path::new("/x/pkg.tar.gz")), "pkg.tar");
        assert_eq!(fallback_name(Path::new("/x/pkg")), "pkg.out");
    }
}
