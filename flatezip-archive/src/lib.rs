//! # FlateZip Archive
//!
//! Archive container format support for FlateZip.
//!
//! This crate provides reading and writing of the container formats that
//! wrap DEFLATE-compressed data:
//!
//! - **GZIP** (RFC 1952): single-file compression, with optional filename,
//!   comment, and header CRC.
//! - **ZIP**: the PKWARE local/central-directory archive format, including
//!   the traditional ZipCrypto stream cipher for password-protected entries.
//!
//! ## Example
//!
//! ```rust,no_run
//! use flatezip_archive::zip::ZipReader;
//! use std::fs::File;
//!
//! let file = File::open("archive.zip").unwrap();
//! let mut reader = ZipReader::new(file).unwrap();
//! for entry in reader.entries() {
//!     println!("{}", entry.name);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod gzip;
pub mod zip;

// Re-exports
pub use gzip::{GzipHeader, GzipReader, GzipWriter};
pub use zip::{
    CompressionMethod, LocalFileHeader, ZipCompressionLevel, ZipCrypto, ZipCryptoReader,
    ZipCryptoWriter, ZipReader, ZipWriter,
};
