//! GZIP header parsing and writing.

use flatezip_core::error::{FlateZipError, Result};
use flatezip_core::{BitReader, Crc32};
use flatezip_deflate::{Inflater, deflate};
use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// GZIP compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// GZIP header flags.
#[allow(dead_code)]
pub mod flags {
    /// Text file.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original filename present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
}

/// GZIP file header.
#[derive(Debug, Clone)]
pub struct GzipHeader {
    /// Compression method (should be 8 for DEFLATE).
    pub method: u8,
    /// Flags.
    pub flags: u8,
    /// Modification time (Unix timestamp).
    pub mtime: u32,
    /// Extra flags.
    pub xfl: u8,
    /// Operating system.
    pub os: u8,
    /// Original filename (if FNAME flag set).
    pub filename: Option<String>,
    /// Comment (if FCOMMENT flag set).
    pub comment: Option<String>,
    /// Header CRC16 (if FHCRC flag set).
    pub header_crc: Option<u16>,
    /// Raw header bytes preceding the CRC16 trailer, as read off the wire.
    /// Populated only by [`GzipHeader::read`]; used by
    /// [`GzipHeader::verify_hcrc`] to recompute the expected CRC16.
    raw_bytes: Vec<u8>,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            method: CM_DEFLATE,
            flags: 0,
            mtime: 0,
            xfl: 0,
            os: 255, // Unknown OS
            filename: None,
            comment: None,
            header_crc: None,
            raw_bytes: Vec::new(),
        }
    }
}

impl GzipHeader {
    /// Create a new GZIP header with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a header with filename.
    pub fn with_filename(filename: &str) -> Self {
        Self {
            flags: flags::FNAME,
            filename: Some(filename.to_string()),
            ..Self::default()
        }
    }

    /// Attach a comment, setting the FCOMMENT flag.
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.flags |= flags::FCOMMENT;
        self.comment = Some(comment.to_string());
        self
    }

    /// Request a header CRC16 trailer, setting the FHCRC flag. The value
    /// itself is computed at [`write`](Self::write) time, since it covers
    /// every header byte preceding it.
    pub fn with_hcrc(mut self) -> Self {
        self.flags |= flags::FHCRC;
        self
    }

    /// Set the modification time to now.
    pub fn with_mtime_now(mut self) -> Self {
        self.mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        self
    }

    /// Write the header to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut header_bytes = Vec::with_capacity(10);

        // Magic
        header_bytes.extend_from_slice(&GZIP_MAGIC);

        // Method
        header_bytes.push(self.method);

        // Flags
        header_bytes.push(self.flags);

        // Modification time
        header_bytes.extend_from_slice(&self.mtime.to_le_bytes());

        // XFL and OS
        header_bytes.push(self.xfl);
        header_bytes.push(self.os);

        // Filename
        if self.flags & flags::FNAME != 0 {
            if let Some(ref filename) = self.filename {
                header_bytes.extend_from_slice(filename.as_bytes());
                header_bytes.push(0); // Null terminator
            }
        }

        // Comment
        if self.flags & flags::FCOMMENT != 0 {
            if let Some(ref comment) = self.comment {
                header_bytes.extend_from_slice(comment.as_bytes());
                header_bytes.push(0); // Null terminator
            }
        }

        writer.write_all(&header_bytes)?;

        // Header CRC16: the low 16 bits of the CRC-32 over every header byte
        // written so far (RFC 1952 §2.3.1).
        if self.flags & flags::FHCRC != 0 {
            let crc = Crc32::compute(&header_bytes) as u16;
            writer.write_all(&crc.to_le_bytes())?;
        }

        Ok(())
    }

    /// Read a GZIP header from a reader.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut raw_bytes = Vec::new();

        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf)?;
        raw_bytes.extend_from_slice(&buf);

        // Check magic
        if buf[0..2] != GZIP_MAGIC {
            return Err(FlateZipError::invalid_magic(
                GZIP_MAGIC.to_vec(),
                buf[0..2].to_vec(),
            ));
        }

        let method = buf[2];
        if method != CM_DEFLATE {
            return Err(FlateZipError::unsupported_feature(format!(
                "GZIP method {}",
                method
            )));
        }

        let flags = buf[3];
        let mtime = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let xfl = buf[8];
        let os = buf[9];

        // Read optional fields
        let mut filename = None;
        let mut comment = None;
        let mut header_crc = None;

        // Extra field
        if flags & flags::FEXTRA != 0 {
            let mut xlen_buf = [0u8; 2];
            reader.read_exact(&mut xlen_buf)?;
            raw_bytes.extend_from_slice(&xlen_buf);
            let xlen = u16::from_le_bytes(xlen_buf) as usize;
            let mut extra = vec![0u8; xlen];
            reader.read_exact(&mut extra)?;
            raw_bytes.extend_from_slice(&extra);
        }

        // Filename
        if flags & flags::FNAME != 0 {
            filename = Some(Self::read_null_terminated(reader, &mut raw_bytes)?);
        }

        // Comment
        if flags & flags::FCOMMENT != 0 {
            comment = Some(Self::read_null_terminated(reader, &mut raw_bytes)?);
        }

        // Header CRC, computed over every header byte preceding it.
        if flags & flags::FHCRC != 0 {
            let mut crc_buf = [0u8; 2];
            reader.read_exact(&mut crc_buf)?;
            header_crc = Some(u16::from_le_bytes(crc_buf));
        }

        Ok(Self {
            method,
            flags,
            mtime,
            xfl,
            os,
            filename,
            comment,
            header_crc,
            raw_bytes,
        })
    }

    /// Check the FHCRC trailer (if present) against the header bytes that
    /// preceded it. A no-op if the header was never read with FHCRC set.
    pub fn verify_hcrc(&self) -> Result<()> {
        if let Some(stored) = self.header_crc {
            let computed = Crc32::compute(&self.raw_bytes) as u16;
            if computed != stored {
                return Err(FlateZipError::crc_mismatch(stored as u32, computed as u32));
            }
        }
        Ok(())
    }

    /// Read a null-terminated string, appending every byte read (including
    /// the terminator) to `raw_bytes` for later header-CRC verification.
    fn read_null_terminated<R: Read>(reader: &mut R, raw_bytes: &mut Vec<u8>) -> Result<String> {
        let mut bytes = Vec::new();
        let mut buf = [0u8; 1];

        loop {
            reader.read_exact(&mut buf)?;
            raw_bytes.push(buf[0]);
            if buf[0] == 0 {
                break;
            }
            bytes.push(buf[0]);
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// GZIP reader that decompresses data.
///
/// A gzip file is a concatenation of one or more independently-framed
/// members (`gzip -9 a.txt b.txt | gzip -d` reproduces both files back to
/// back, for instance). [`decompress`](Self::decompress) walks every member
/// and concatenates their payloads; [`headers`](Self::headers) exposes the
/// per-member metadata discovered along the way, in file order.
pub struct GzipReader<R: Read> {
    /// Underlying reader.
    reader: R,
    /// Parsed header of the first member.
    header: GzipHeader,
    /// Headers of every member seen so far, populated by `decompress`.
    headers: Vec<GzipHeader>,
}

impl<R: Read> GzipReader<R> {
    /// Create a new GZIP reader.
    pub fn new(mut reader: R) -> Result<Self> {
        let header = GzipHeader::read(&mut reader)?;
        Ok(Self {
            reader,
            header,
            headers: Vec::new(),
        })
    }

    /// Get the first member's header.
    pub fn header(&self) -> &GzipHeader {
        &self.header
    }

    /// Get every member's header, in file order. Populated only after
    /// [`decompress`](Self::decompress) has run.
    pub fn headers(&self) -> &[GzipHeader] {
        &self.headers
    }

    /// Decompress the data, concatenating every member's payload.
    ///
    /// `verify` gates every checksum this format carries: each member's
    /// CRC-32/ISIZE trailer, and — for members that set FHCRC — the header
    /// CRC16. Off by default for speed, per the crate-wide convention.
    pub fn decompress(&mut self, verify: bool) -> Result<Vec<u8>> {
        // Read everything past the already-parsed first header into memory;
        // member boundaries are discovered as we decode, not known up front.
        let mut rest = Vec::new();
        self.reader.read_to_end(&mut rest)?;

        self.headers.clear();
        if verify {
            self.header.verify_hcrc()?;
        }
        self.headers.push(self.header.clone());

        let mut output = Vec::new();
        let mut offset = 0usize;
        offset = decompress_member(&rest, offset, verify, &mut output)?;

        while offset < rest.len() {
            let mut cursor = &rest[offset..];
            let before = cursor.len();
            let member_header = GzipHeader::read(&mut cursor)?;
            let header_len = before - cursor.len();
            offset += header_len;

            if verify {
                member_header.verify_hcrc()?;
            }
            self.headers.push(member_header);
            offset = decompress_member(&rest, offset, verify, &mut output)?;
        }

        Ok(output)
    }
}

/// Decode one member's DEFLATE stream starting at `offset` in `data`,
/// optionally verify its trailer, append the payload to `output`, and return
/// the offset of the byte immediately following the trailer (the next
/// member, if any).
fn decompress_member(
    data: &[u8],
    offset: usize,
    verify: bool,
    output: &mut Vec<u8>,
) -> Result<usize> {
    let mut slice = &data[offset..];
    let mut bit_reader = BitReader::new(&mut slice);
    let decompressed = Inflater::new().inflate(&mut bit_reader)?;
    let consumed = bit_reader.consumed_bytes();

    let trailer_start = offset + consumed;
    if data.len() < trailer_start + 8 {
        return Err(FlateZipError::unexpected_eof(8));
    }
    let trailer = &data[trailer_start..trailer_start + 8];
    let expected_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let expected_size = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);

    if verify {
        let actual_crc = Crc32::compute(&decompressed);
        if actual_crc != expected_crc {
            return Err(FlateZipError::crc_mismatch(expected_crc, actual_crc));
        }
        // ISIZE is the uncompressed size modulo 2^32, per RFC 1952 §2.3.1.
        if (decompressed.len() as u64) % (1u64 << 32) != expected_size as u64 {
            return Err(FlateZipError::corrupted(
                0,
                format!(
                    "Size mismatch: expected {}, got {}",
                    expected_size,
                    decompressed.len()
                ),
            ));
        }
    }

    output.extend_from_slice(&decompressed);
    Ok(trailer_start + 8)
}

/// GZIP writer that compresses data.
pub struct GzipWriter {
    /// Header to use.
    header: GzipHeader,
    /// Compression level (0-9).
    level: u8,
}

impl GzipWriter {
    /// Create a new GZIP writer with default settings.
    pub fn new() -> Self {
        Self {
            header: GzipHeader::new(),
            level: 6,
        }
    }

    /// Create a writer with a specific header.
    pub fn with_header(header: GzipHeader) -> Self {
        Self { header, level: 6 }
    }

    /// Attach a comment to the header (sets FCOMMENT).
    pub fn comment(mut self, comment: &str) -> Self {
        self.header = self.header.with_comment(comment);
        self
    }

    /// Request a header CRC16 (sets FHCRC).
    pub fn hcrc(mut self) -> Self {
        self.header = self.header.with_hcrc();
        self
    }

    /// Set compression level (0-9).
    pub fn level(mut self, level: u8) -> Self {
        self.level = level.min(9);
        // Set XFL based on level
        self.header.xfl = match self.level {
            0..=1 => 4, // Fastest
            9 => 2,     // Maximum compression
            _ => 0,     // Default
        };
        self
    }

    /// Compress data and write to a writer.
    pub fn compress<W: Write>(&self, data: &[u8], writer: &mut W) -> Result<()> {
        // Write header
        self.header.write(writer)?;

        // Compress with DEFLATE
        let compressed = deflate(data, self.level)?;
        writer.write_all(&compressed)?;

        // Write trailer (CRC32 + ISIZE)
        let crc = Crc32::compute(data);
        writer.write_all(&crc.to_le_bytes())?;

        let isize = (data.len() as u32).to_le_bytes();
        writer.write_all(&isize)?;

        Ok(())
    }

    /// Compress data and return as Vec.
    pub fn compress_to_vec(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.compress(data, &mut output)?;
        Ok(output)
    }
}

impl Default for GzipWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Compress data to GZIP format.
pub fn compress(data: &[u8], level: u8) -> Result<Vec<u8>> {
    GzipWriter::new().level(level).compress_to_vec(data)
}

/// Compress data to GZIP format with filename.
pub fn compress_with_filename(data: &[u8], filename: &str, level: u8) -> Result<Vec<u8>> {
    let header = GzipHeader::with_filename(filename).with_mtime_now();
    GzipWriter::with_header(header)
        .level(level)
        .compress_to_vec(data)
}
