//! GZIP format support (RFC 1952).
//!
//! GZIP is a file format for single-file compression using DEFLATE. A gzip
//! stream may concatenate several independently-framed members one after
//! another (e.g. `cat a.gz b.gz > both.gz`); [`GzipReader::decompress`]
//! decodes and concatenates every member it finds.
//!
//! ## Example
//!
//! ```rust
//! use flatezip_archive::gzip;
//!
//! // Compress data
//! let data = b"Hello, World!";
//! let compressed = gzip::compress(data, 6).unwrap();
//!
//! // Decompress data
//! let mut reader = std::io::Cursor::new(compressed);
//! let decompressed = gzip::decompress(&mut reader, true).unwrap();
//! assert_eq!(decompressed, data);
//! ```

mod header;

pub use header::{GzipHeader, GzipReader, GzipWriter, compress, compress_with_filename};

use flatezip_core::error::Result;
use std::io::Read;

/// Decompress a GZIP file.
///
/// `verify` gates the CRC-32/ISIZE/FHCRC checks; see
/// [`GzipReader::decompress`].
pub fn decompress<R: Read>(reader: &mut R, verify: bool) -> Result<Vec<u8>> {
    let mut gzip_reader = GzipReader::new(reader)?;
    gzip_reader.decompress(verify)
}
