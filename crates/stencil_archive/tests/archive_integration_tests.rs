//! Integration tests for the pack/compress pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use stencil_archive::{compress, decompress, pack, unpack, ArchiveError};
use tempfile::tempdir;
use walkdir::WalkDir;

/// Collect relative paths and file contents under `root`.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            let contents = if e.file_type().is_file() {
                Some(fs::read(e.path()).unwrap())
            } else {
                None
            };
            (relative, contents)
        })
        .collect()
}

fn sample_tree(root: &Path) {
    fs::create_dir_all(root.join("content/src/nested")).unwrap();
    fs::create_dir_all(root.join("content/empty")).unwrap();
    fs::write(root.join("stencil-config.yml"), "template:\n  id: widget\n").unwrap();
    fs::write(root.join("content/README.md.tmpl"), "# {{project_name}}\n").unwrap();
    fs::write(root.join("content/src/nested/blob.bin"), [0u8, 159, 146, 150, 255]).unwrap();
}

#[test]
fn test_pack_unpack_round_trip() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("widget");
    sample_tree(&source);

    let scratch = temp.path().join("scratch");
    fs::create_dir_all(&scratch).unwrap();
    let archive = pack(&source, &scratch).unwrap();

    let out = temp.path().join("out");
    let root = unpack(&archive, &out).unwrap();

    assert_eq!(root, out.join("widget"));
    assert_eq!(snapshot(&source), snapshot(&root));
}

#[test]
fn test_full_package_round_trip() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("widget");
    sample_tree(&source);

    let scratch = temp.path().join("scratch");
    let pkg_dir = temp.path().join("pkg");
    let extract = temp.path().join("extract");
    for dir in [&scratch, &pkg_dir, &extract] {
        fs::create_dir_all(dir).unwrap();
    }

    let archive = pack(&source, &scratch).unwrap();
    let package = compress(&archive, &pkg_dir).unwrap();
    assert_eq!(package, pkg_dir.join("widget.tar.gz"));

    let restored = decompress(&package, &extract).unwrap();
    assert_eq!(restored, extract.join("widget.tar"));

    let root = unpack(&restored, &extract.join("tree")).unwrap();
    assert_eq!(snapshot(&source), snapshot(&root));
}

#[test]
fn test_unpack_root_is_derived_from_archive_name() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("widget");
    sample_tree(&source);

    let archive = pack(&source, temp.path()).unwrap();
    let renamed = temp.path().join("gadget.v2.tar");
    fs::rename(&archive, &renamed).unwrap();

    let out = temp.path().join("out");
    let root = unpack(&renamed, &out).unwrap();

    assert_eq!(root, out.join("gadget"));
    assert!(!root.exists());
    assert!(out.join("widget/stencil-config.yml").exists());
}

#[test]
fn test_unpack_rejects_path_traversal() {
    let temp = tempdir().unwrap();
    let archive_path = temp.path().join("evil.tar");

    {
        let file = fs::File::create(&archive_path).unwrap();
        let mut builder = tar::Builder::new(file);
        let data = b"owned";
        let mut header = tar::Header::new_old();
        let name = b"../escaped.txt";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, &data[..]).unwrap();
        builder.finish().unwrap();
    }

    let out = temp.path().join("nested/out");
    let err = unpack(&archive_path, &out).unwrap_err();

    assert!(matches!(err, ArchiveError::Security { .. }));
    assert!(!temp.path().join("nested/escaped.txt").exists());
}

#[test]
fn test_decompress_reports_format_error_on_checksum_mismatch() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("payload.tar");
    fs::write(&input, b"payload bytes that will be compressed").unwrap();
    let compressed = compress(&input, temp.path()).unwrap();

    // Corrupt the CRC32 trailer.
    let mut bytes = fs::read(&compressed).unwrap();
    let len = bytes.len();
    for byte in &mut bytes[len - 8..len - 4] {
        *byte ^= 0xff;
    }
    fs::write(&compressed, bytes).unwrap();

    let out = temp.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let err = decompress(&compressed, &out).unwrap_err();
    assert!(err.is_format(), "unexpected error: {err}");
}
