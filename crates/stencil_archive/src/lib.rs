//! # stencil_archive
//!
//! Archive codecs for stencil template packages.
//!
//! A template package is built in two independent stages, and each stage
//! reports its own failures:
//!
//! - **Pack / Unpack**: directory tree ⇄ single tar archive
//! - **Compress / Decompress**: single file ⇄ gzip stream that remembers the
//!   original file name
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use stencil_archive::{compress, decompress, pack, unpack};
//!
//! let tar = pack(Path::new("good-project"), Path::new("/tmp/scratch")).unwrap();
//! let package = compress(&tar, Path::new("pkg")).unwrap();
//!
//! let tar = decompress(&package, Path::new("/tmp/extract")).unwrap();
//! let root = unpack(&tar, Path::new("/tmp/extract/out")).unwrap();
//! ```

pub mod archive;
pub mod compress;
pub mod error;

pub use archive::{pack, unpack, ARCHIVE_EXTENSION};
pub use compress::{compress, decompress, COMPRESSED_EXTENSION};
pub use error::{ArchiveError, ArchiveResult};
