//! # FlateZip Core
//!
//! Core components for the FlateZip library.
//!
//! This crate provides the fundamental building blocks that the DEFLATE
//! codec and the zlib/gzip/zip wrappers are built on:
//!
//! - [`bitstream`]: Bit-level I/O for variable-length codes (Huffman, etc.)
//! - [`ringbuffer`]: Sliding window buffer for LZ77 decompression
//! - [`crc`]: CRC-32 checksum
//! - [`traits`]: Core traits for compression/decompression
//! - [`entry`]: Archive entry metadata
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! FlateZip is layered:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Container                                           │
//! │     zlib, gzip, zip header/container parsing            │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Deflate (LZ77 + Huffman)                            │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: BitStream (this crate)                              │
//! │     BitReader/BitWriter, RingBuffer, CRC                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use flatezip_core::bitstream::{BitReader, BitWriter};
//! use flatezip_core::crc::Crc32;
//! use std::io::Cursor;
//!
//! // Read bits from data
//! let data = vec![0xAB, 0xCD];
//! let mut reader = BitReader::new(Cursor::new(data));
//! let bits = reader.read_bits(12).unwrap();
//!
//! // Compute CRC-32
//! let crc = Crc32::compute(b"Hello, World!");
//! assert_eq!(crc, 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod crc;
pub mod entry;
pub mod error;
pub mod ringbuffer;
pub mod traits;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use crc::Crc32;
pub use entry::{CompressionMethod, Entry, EntryType, FileAttributes};
pub use error::{FlateZipError, Result};
pub use ringbuffer::{OutputRingBuffer, RingBuffer};
pub use traits::{
    ArchiveReader, ArchiveWriter, CompressStatus, CompressionLevel, Compressor, DecompressStatus,
    Decompressor, FlushMode,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::crc::Crc32;
    pub use crate::entry::{CompressionMethod, Entry, EntryType};
    pub use crate::error::{FlateZipError, Result};
    pub use crate::ringbuffer::{OutputRingBuffer, RingBuffer};
    pub use crate::traits::{
        ArchiveReader, ArchiveWriter, CompressionLevel, Compressor, Decompressor,
    };
}
