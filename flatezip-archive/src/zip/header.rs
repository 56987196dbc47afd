//! ZIP header structures.

use flatezip_core::entry::CompressionMethod as CoreMethod;
use flatezip_core::error::{FlateZipError, Result};
use flatezip_core::{Crc32, Entry, EntryType, FileAttributes};
use flatezip_deflate::{deflate, inflate};
use std::io::{Read, Seek, SeekFrom, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// ZIP local file header signature.
pub const LOCAL_FILE_HEADER_SIG: u32 = 0x04034B50;

/// ZIP central directory header signature.
pub const CENTRAL_DIR_HEADER_SIG: u32 = 0x02014B50;

/// ZIP end of central directory signature.
pub const END_OF_CENTRAL_DIR_SIG: u32 = 0x06054B50;

/// ZIP64 end of central directory locator signature.
///
/// This crate does not implement Zip64: archives that need it (more than
/// 65535 entries, or any single entry/offset that doesn't fit in 32 bits)
/// are rejected with [`FlateZipError::unsupported_feature`]. The locator
/// signature is only used to recognize that case and name it in the error.
pub const ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG: u32 = 0x07064B50;

/// Marker value for Zip64 (0xFFFFFFFF for 32-bit fields).
pub const ZIP64_MARKER_32: u32 = 0xFFFF_FFFF;

/// Marker value for Zip64 (0xFFFF for 16-bit fields).
pub const ZIP64_MARKER_16: u16 = 0xFFFF;

/// Data descriptor signature (optional, PK\x07\x08).
pub const DATA_DESCRIPTOR_SIG: u32 = 0x08074B50;

/// Flag bit for data descriptor presence.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// ZIP compression methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stored (no compression).
    Stored,
    /// Deflate compression.
    Deflate,
    /// Unknown method.
    Unknown(u16),
}

impl CompressionMethod {
    /// Create from a u16 value.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Stored,
            8 => Self::Deflate,
            _ => Self::Unknown(value),
        }
    }

    /// Convert to core compression method.
    pub fn to_core(&self) -> CoreMethod {
        match self {
            Self::Stored => CoreMethod::Stored,
            Self::Deflate => CoreMethod::Deflate,
            Self::Unknown(id) => CoreMethod::Unknown(*id),
        }
    }
}

/// ZIP local file header.
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flag.
    pub flags: u16,
    /// Compression method.
    pub method: CompressionMethod,
    /// Last modification time.
    pub mtime: u16,
    /// Last modification date.
    pub mdate: u16,
    /// CRC-32 of uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u32,
    /// Uncompressed size.
    pub uncompressed_size: u32,
    /// File name.
    pub filename: String,
    /// Extra field.
    pub extra: Vec<u8>,
    /// Offset to file data.
    pub data_offset: u64,
}

impl LocalFileHeader {
    /// Read a local file header.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 30];
        reader.read_exact(&mut buf)?;

        let signature = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if signature != LOCAL_FILE_HEADER_SIG {
            return Err(FlateZipError::invalid_magic(
                LOCAL_FILE_HEADER_SIG.to_le_bytes().to_vec(),
                signature.to_le_bytes().to_vec(),
            ));
        }

        let version_needed = u16::from_le_bytes([buf[4], buf[5]]);
        let flags = u16::from_le_bytes([buf[6], buf[7]]);
        let method = CompressionMethod::from_u16(u16::from_le_bytes([buf[8], buf[9]]));
        let mtime = u16::from_le_bytes([buf[10], buf[11]]);
        let mdate = u16::from_le_bytes([buf[12], buf[13]]);
        let crc32 = u32::from_le_bytes([buf[14], buf[15], buf[16], buf[17]]);
        let compressed_size = u32::from_le_bytes([buf[18], buf[19], buf[20], buf[21]]);
        let uncompressed_size = u32::from_le_bytes([buf[22], buf[23], buf[24], buf[25]]);
        let filename_len = u16::from_le_bytes([buf[26], buf[27]]) as usize;
        let extra_len = u16::from_le_bytes([buf[28], buf[29]]) as usize;

        // Read filename
        let mut filename_bytes = vec![0u8; filename_len];
        reader.read_exact(&mut filename_bytes)?;
        let filename = String::from_utf8_lossy(&filename_bytes).into_owned();

        // Read extra field
        let mut extra = vec![0u8; extra_len];
        reader.read_exact(&mut extra)?;

        if uncompressed_size == ZIP64_MARKER_32 || compressed_size == ZIP64_MARKER_32 {
            return Err(FlateZipError::unsupported_feature("Zip64"));
        }

        Ok(Self {
            version_needed,
            flags,
            method,
            mtime,
            mdate,
            crc32,
            compressed_size,
            uncompressed_size,
            filename,
            extra,
            data_offset: 0, // Set by caller
        })
    }

    /// Convert DOS date/time to SystemTime.
    pub fn modified_time(&self) -> SystemTime {
        let seconds = (self.mtime & 0x1F) as u64 * 2;
        let minutes = ((self.mtime >> 5) & 0x3F) as u64;
        let hours = ((self.mtime >> 11) & 0x1F) as u64;
        let day = (self.mdate & 0x1F) as u64;
        let month = ((self.mdate >> 5) & 0x0F) as u64;
        let year = ((self.mdate >> 9) & 0x7F) as u64 + 1980;

        // Approximate: Days since Unix epoch
        let days = (year - 1970) * 365 + (year - 1969) / 4 + (month - 1) * 30 + day;
        let total_seconds = days * 86400 + hours * 3600 + minutes * 60 + seconds;

        UNIX_EPOCH + Duration::from_secs(total_seconds)
    }

    /// Convert to Entry.
    pub fn to_entry(&self) -> Entry {
        let entry_type = if self.filename.ends_with('/') {
            EntryType::Directory
        } else {
            EntryType::File
        };

        let size = self.uncompressed_size as u64;
        let compressed_size = self.compressed_size as u64;

        Entry {
            name: self.filename.clone(),
            entry_type,
            size,
            compressed_size,
            method: self.method.to_core(),
            modified: Some(self.modified_time()),
            created: None,
            accessed: None,
            attributes: FileAttributes::default(),
            crc32: Some(self.crc32),
            comment: None,
            link_target: None,
            offset: self.data_offset,
            extra: self.extra.clone(),
            encrypted: self.flags & super::crypto::FLAG_ENCRYPTED != 0,
        }
    }

    /// Get the uncompressed size as a 64-bit value.
    pub fn actual_uncompressed_size(&self) -> u64 {
        self.uncompressed_size as u64
    }

    /// Get the compressed size as a 64-bit value.
    pub fn actual_compressed_size(&self) -> u64 {
        self.compressed_size as u64
    }

    /// Check if this entry has a data descriptor following the compressed data.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }
}

/// ZIP data descriptor (appears after compressed data when FLAG_DATA_DESCRIPTOR is set).
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
pub struct DataDescriptor {
    /// CRC-32 of uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u64,
    /// Uncompressed size.
    pub uncompressed_size: u64,
}

impl DataDescriptor {
    /// Read a data descriptor.
    /// The descriptor may optionally start with a signature (0x08074B50).
    /// Returns (descriptor, bytes_consumed).
    pub fn read<R: Read>(reader: &mut R) -> Result<(Self, usize)> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;

        let first_word = u32::from_le_bytes(buf);
        let mut bytes_consumed = 4;

        // Check if this is the optional signature
        let crc32 = if first_word == DATA_DESCRIPTOR_SIG {
            // Signature present, read CRC32
            reader.read_exact(&mut buf)?;
            bytes_consumed += 4;
            u32::from_le_bytes(buf)
        } else {
            // No signature, first word is CRC32
            first_word
        };

        reader.read_exact(&mut buf)?;
        let compressed_size = u32::from_le_bytes(buf) as u64;
        reader.read_exact(&mut buf)?;
        let uncompressed_size = u32::from_le_bytes(buf) as u64;
        bytes_consumed += 8;

        Ok((
            Self {
                crc32,
                compressed_size,
                uncompressed_size,
            },
            bytes_consumed,
        ))
    }
}

/// ZIP archive reader.
pub struct ZipReader<R: Read + Seek> {
    reader: R,
    entries: Vec<Entry>,
}

impl<R: Read + Seek> ZipReader<R> {
    /// Create a new ZIP reader.
    pub fn new(mut reader: R) -> Result<Self> {
        let entries = Self::read_entries(&mut reader)?;
        Ok(Self { reader, entries })
    }

    /// Read all entries from the archive.
    /// Uses the central directory for accurate metadata (handles data descriptors).
    fn read_entries(reader: &mut R) -> Result<Vec<Entry>> {
        // Try to find and read from central directory first
        if let Ok(entries) = Self::read_from_central_directory(reader) {
            return Ok(entries);
        }

        // Fall back to scanning local headers
        Self::read_from_local_headers(reader)
    }

    /// Read entries from the central directory (preferred method).
    fn read_from_central_directory(reader: &mut R) -> Result<Vec<Entry>> {
        // Find end of central directory record
        let file_size = reader.seek(SeekFrom::End(0))?;

        // Search for EOCD signature (max comment is 65535 bytes)
        let search_start = file_size.saturating_sub(65535 + 22);
        reader.seek(SeekFrom::Start(search_start))?;

        let mut buf = vec![0u8; (file_size - search_start) as usize];
        reader.read_exact(&mut buf)?;

        // Find EOCD signature (backwards)
        let eocd_sig = END_OF_CENTRAL_DIR_SIG.to_le_bytes();
        let eocd_offset = buf
            .windows(4)
            .rposition(|w| w == eocd_sig)
            .ok_or_else(|| FlateZipError::invalid_header("End of central directory not found"))?;

        let eocd_pos = search_start + eocd_offset as u64;

        // A Zip64 EOCD locator immediately precedes the standard EOCD record
        // when present; this crate doesn't support Zip64 archives.
        if eocd_pos >= 20 {
            reader.seek(SeekFrom::Start(eocd_pos - 20))?;
            let mut locator_buf = [0u8; 4];
            reader.read_exact(&mut locator_buf)?;
            if u32::from_le_bytes(locator_buf) == ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG {
                return Err(FlateZipError::unsupported_feature("Zip64"));
            }
        }

        let (cd_offset, cd_size, total_entries) = Self::parse_standard_eocd(&buf[eocd_offset..])?;

        // Read central directory entries
        reader.seek(SeekFrom::Start(cd_offset))?;
        let mut entries = Vec::with_capacity(total_entries as usize);

        for _ in 0..total_entries {
            let entry = Self::read_central_dir_entry(reader)?;
            entries.push(entry);
        }

        // Validate we consumed the expected amount
        let _expected_end = cd_offset + cd_size;

        Ok(entries)
    }

    /// Parse standard EOCD record.
    fn parse_standard_eocd(buf: &[u8]) -> Result<(u64, u64, u64)> {
        if buf.len() < 22 {
            return Err(FlateZipError::invalid_header("EOCD too short"));
        }

        let total_entries = u16::from_le_bytes([buf[10], buf[11]]);
        let cd_size = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);
        let cd_offset = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);

        if total_entries == ZIP64_MARKER_16 || cd_size == ZIP64_MARKER_32 || cd_offset == ZIP64_MARKER_32 {
            return Err(FlateZipError::unsupported_feature("Zip64"));
        }

        Ok((cd_offset as u64, cd_size as u64, total_entries as u64))
    }

    /// Read a single central directory entry.
    fn read_central_dir_entry(reader: &mut R) -> Result<Entry> {
        let mut buf = [0u8; 46];
        reader.read_exact(&mut buf)?;

        let signature = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if signature != CENTRAL_DIR_HEADER_SIG {
            return Err(FlateZipError::invalid_magic(
                CENTRAL_DIR_HEADER_SIG.to_le_bytes().to_vec(),
                signature.to_le_bytes().to_vec(),
            ));
        }

        let flags = u16::from_le_bytes([buf[8], buf[9]]);
        let method = CompressionMethod::from_u16(u16::from_le_bytes([buf[10], buf[11]]));
        let mtime = u16::from_le_bytes([buf[12], buf[13]]);
        let mdate = u16::from_le_bytes([buf[14], buf[15]]);
        let crc32 = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
        let compressed_size = u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]);
        let uncompressed_size = u32::from_le_bytes([buf[24], buf[25], buf[26], buf[27]]);
        let filename_len = u16::from_le_bytes([buf[28], buf[29]]) as usize;
        let extra_len = u16::from_le_bytes([buf[30], buf[31]]) as usize;
        let comment_len = u16::from_le_bytes([buf[32], buf[33]]) as usize;
        let local_header_offset = u32::from_le_bytes([buf[42], buf[43], buf[44], buf[45]]);

        // Read variable-length fields
        let mut filename_bytes = vec![0u8; filename_len];
        reader.read_exact(&mut filename_bytes)?;
        let filename = String::from_utf8_lossy(&filename_bytes).into_owned();

        let mut extra = vec![0u8; extra_len];
        reader.read_exact(&mut extra)?;

        let mut comment_bytes = vec![0u8; comment_len];
        reader.read_exact(&mut comment_bytes)?;
        let comment = String::from_utf8_lossy(&comment_bytes).into_owned();

        if uncompressed_size == ZIP64_MARKER_32
            || compressed_size == ZIP64_MARKER_32
            || local_header_offset == ZIP64_MARKER_32
        {
            return Err(FlateZipError::unsupported_feature("Zip64"));
        }

        let actual_uncompressed = uncompressed_size as u64;
        let actual_compressed = compressed_size as u64;
        let actual_header_offset = local_header_offset as u64;

        // Calculate data offset by reading local header length
        // Local header: 30 bytes fixed + filename_len + extra_len
        // We need to peek at the local header's extra field length (may differ from central)
        let current_pos = reader.stream_position()?;
        reader.seek(SeekFrom::Start(actual_header_offset + 26))?;
        let mut local_lens = [0u8; 4];
        reader.read_exact(&mut local_lens)?;
        let local_filename_len = u16::from_le_bytes([local_lens[0], local_lens[1]]) as u64;
        let local_extra_len = u16::from_le_bytes([local_lens[2], local_lens[3]]) as u64;
        let data_offset = actual_header_offset + 30 + local_filename_len + local_extra_len;
        reader.seek(SeekFrom::Start(current_pos))?;

        let entry_type = if filename.ends_with('/') {
            EntryType::Directory
        } else {
            EntryType::File
        };

        // Convert DOS time to SystemTime
        let seconds = (mtime & 0x1F) as u64 * 2;
        let minutes = ((mtime >> 5) & 0x3F) as u64;
        let hours = ((mtime >> 11) & 0x1F) as u64;
        let day = (mdate & 0x1F) as u64;
        let month = ((mdate >> 5) & 0x0F) as u64;
        let year = ((mdate >> 9) & 0x7F) as u64 + 1980;
        let days = (year - 1970) * 365 + (year - 1969) / 4 + (month - 1) * 30 + day;
        let total_seconds = days * 86400 + hours * 3600 + minutes * 60 + seconds;
        let modified = UNIX_EPOCH + Duration::from_secs(total_seconds);

        // Mark entries with data descriptors in the extra data
        let mut entry_extra = extra.clone();
        if flags & FLAG_DATA_DESCRIPTOR != 0 {
            // Add a marker so we know this entry used a data descriptor
            entry_extra.extend_from_slice(&[0xDD, 0xDD]); // Custom marker
        }

        Ok(Entry {
            name: filename,
            entry_type,
            size: actual_uncompressed,
            compressed_size: actual_compressed,
            method: method.to_core(),
            modified: Some(modified),
            created: None,
            accessed: None,
            attributes: FileAttributes::default(),
            crc32: Some(crc32),
            comment: if comment.is_empty() {
                None
            } else {
                Some(comment)
            },
            link_target: None,
            offset: data_offset,
            extra: entry_extra,
            encrypted: flags & super::crypto::FLAG_ENCRYPTED != 0,
        })
    }

    /// Read entries from local headers (fallback, doesn't handle data descriptors well).
    fn read_from_local_headers(reader: &mut R) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();

        // Start from beginning
        reader.seek(SeekFrom::Start(0))?;

        loop {
            let pos = reader.stream_position()?;

            // Try to read signature
            let mut sig_buf = [0u8; 4];
            if reader.read_exact(&mut sig_buf).is_err() {
                break;
            }

            let signature = u32::from_le_bytes(sig_buf);

            if signature == LOCAL_FILE_HEADER_SIG {
                // Seek back and read full header
                reader.seek(SeekFrom::Start(pos))?;
                let mut header = LocalFileHeader::read(reader)?;

                // Record data offset
                header.data_offset = reader.stream_position()?;

                // Handle data descriptor case
                if header.has_data_descriptor() && header.compressed_size == 0 {
                    // Can't skip properly without scanning for next header or reading central dir
                    // This is why we prefer central directory parsing
                    break;
                }

                // Skip compressed data
                let compressed_size = header.actual_compressed_size();
                reader.seek(SeekFrom::Current(compressed_size as i64))?;

                // Skip data descriptor if present
                if header.has_data_descriptor() {
                    let (descriptor, _) = DataDescriptor::read(reader)?;
                    // Note: can't mutate header here, but we've already created the
                    // entry; this is fine since the central directory path is preferred.
                    let _ = descriptor;
                }

                entries.push(header.to_entry());
            } else if signature == CENTRAL_DIR_HEADER_SIG || signature == END_OF_CENTRAL_DIR_SIG {
                // Reached central directory, stop
                break;
            } else {
                // Unknown signature, stop
                break;
            }
        }

        Ok(entries)
    }

    /// Get the list of entries.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Extract an entry.
    ///
    /// `verify` gates the local-header CRC-32 check against the decompressed
    /// bytes; off by default for speed, per the crate-wide convention.
    ///
    /// Returns [`FlateZipError::missing_password`] if the entry is encrypted;
    /// use [`ZipReader::extract_with_password`] for those.
    pub fn extract(&mut self, entry: &Entry, verify: bool) -> Result<Vec<u8>> {
        if entry.encrypted {
            return Err(FlateZipError::missing_password(&entry.name));
        }

        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let mut compressed = vec![0u8; entry.compressed_size as usize];
        self.reader.read_exact(&mut compressed)?;

        Self::finish_extract(entry, compressed, verify)
    }

    /// Extract a password-protected entry.
    ///
    /// Decrypts the ZipCrypto stream with `password`, verifying it against
    /// the entry's 12-byte encryption header before decompressing (this
    /// password check always runs, independent of `verify`). Works on
    /// non-encrypted entries too (the password is simply unused). `verify`
    /// gates the local-header CRC-32 check against the decompressed bytes.
    pub fn extract_with_password(
        &mut self,
        entry: &Entry,
        password: &[u8],
        verify: bool,
    ) -> Result<Vec<u8>> {
        if !entry.encrypted {
            return self.extract(entry, verify);
        }

        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let mut encrypted = vec![0u8; entry.compressed_size as usize];
        self.reader.read_exact(&mut encrypted)?;

        if encrypted.len() < super::crypto::ENCRYPTION_HEADER_SIZE {
            return Err(FlateZipError::invalid_header(
                "Encrypted entry shorter than the ZipCrypto header",
            ));
        }

        let expected_crc = entry.crc32.unwrap_or(0);
        let mut cipher = super::crypto::ZipCrypto::new(password);
        let mut header_cursor = std::io::Cursor::new(
            &encrypted[..super::crypto::ENCRYPTION_HEADER_SIZE],
        );
        if cipher.verify_header(&mut header_cursor, expected_crc).is_err() {
            return Err(FlateZipError::bad_password(&entry.name));
        }

        let mut compressed = encrypted.split_off(super::crypto::ENCRYPTION_HEADER_SIZE);
        cipher.decrypt_buffer(&mut compressed);

        Self::finish_extract(entry, compressed, verify)
    }

    /// Decompress already-decrypted `compressed` bytes, checking the CRC-32
    /// only when `verify` is set.
    fn finish_extract(entry: &Entry, compressed: Vec<u8>, verify: bool) -> Result<Vec<u8>> {
        let decompressed = match entry.method {
            CoreMethod::Stored => compressed,
            CoreMethod::Deflate => inflate(&compressed)?,
            _ => return Err(FlateZipError::unsupported_feature(format!("{} compression method", entry.method))),
        };

        if verify {
            if let Some(expected_crc) = entry.crc32 {
                let actual_crc = Crc32::compute(&decompressed);
                if actual_crc != expected_crc {
                    return Err(FlateZipError::crc_mismatch(expected_crc, actual_crc));
                }
            }
        }

        Ok(decompressed)
    }

    /// Get entry by name.
    pub fn entry_by_name(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// ZIP compression level for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZipCompressionLevel {
    /// Store without compression (method 0).
    Store,
    /// Fast compression (deflate level 1).
    Fast,
    /// Normal compression (deflate level 6).
    #[default]
    Normal,
    /// Best compression (deflate level 9).
    Best,
}

/// Central directory entry for ZIP writing.
#[derive(Debug, Clone)]
struct CentralDirEntry {
    /// Version made by.
    version_made_by: u16,
    /// Version needed to extract.
    version_needed: u16,
    /// General purpose bit flag.
    flags: u16,
    /// Compression method.
    method: u16,
    /// Last modification time.
    mtime: u16,
    /// Last modification date.
    mdate: u16,
    /// CRC-32 of uncompressed data.
    crc32: u32,
    /// Compressed size.
    compressed_size: u32,
    /// Uncompressed size.
    uncompressed_size: u32,
    /// File name.
    filename: String,
    /// Extra field.
    extra: Vec<u8>,
    /// File comment.
    comment: String,
    /// Disk number start.
    disk_start: u16,
    /// Internal file attributes.
    internal_attr: u16,
    /// External file attributes.
    external_attr: u32,
    /// Relative offset of local header.
    local_header_offset: u32,
}

impl CentralDirEntry {
    /// Write the central directory entry.
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let filename_bytes = self.filename.as_bytes();
        let comment_bytes = self.comment.as_bytes();

        // Signature
        writer.write_all(&CENTRAL_DIR_HEADER_SIG.to_le_bytes())?;
        // Version made by
        writer.write_all(&self.version_made_by.to_le_bytes())?;
        // Version needed
        writer.write_all(&self.version_needed.to_le_bytes())?;
        // Flags
        writer.write_all(&self.flags.to_le_bytes())?;
        // Compression method
        writer.write_all(&self.method.to_le_bytes())?;
        // Modification time
        writer.write_all(&self.mtime.to_le_bytes())?;
        // Modification date
        writer.write_all(&self.mdate.to_le_bytes())?;
        // CRC-32
        writer.write_all(&self.crc32.to_le_bytes())?;
        // Compressed size
        writer.write_all(&self.compressed_size.to_le_bytes())?;
        // Uncompressed size
        writer.write_all(&self.uncompressed_size.to_le_bytes())?;
        // Filename length
        writer.write_all(&(filename_bytes.len() as u16).to_le_bytes())?;
        // Extra field length
        writer.write_all(&(self.extra.len() as u16).to_le_bytes())?;
        // Comment length
        writer.write_all(&(comment_bytes.len() as u16).to_le_bytes())?;
        // Disk number start
        writer.write_all(&self.disk_start.to_le_bytes())?;
        // Internal file attributes
        writer.write_all(&self.internal_attr.to_le_bytes())?;
        // External file attributes
        writer.write_all(&self.external_attr.to_le_bytes())?;
        // Relative offset of local header
        writer.write_all(&self.local_header_offset.to_le_bytes())?;
        // Filename
        writer.write_all(filename_bytes)?;
        // Extra field
        writer.write_all(&self.extra)?;
        // Comment
        writer.write_all(comment_bytes)?;

        Ok(())
    }

    /// Get the size of this entry when written.
    fn written_size(&self) -> usize {
        46 + self.filename.len() + self.extra.len() + self.comment.len()
    }
}

/// ZIP archive writer.
pub struct ZipWriter<W: Write> {
    writer: W,
    entries: Vec<CentralDirEntry>,
    offset: u64,
    compression: ZipCompressionLevel,
    finished: bool,
}

impl<W: Write> ZipWriter<W> {
    /// Create a new ZIP writer with default compression.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            entries: Vec::new(),
            offset: 0,
            compression: ZipCompressionLevel::default(),
            finished: false,
        }
    }

    /// Set the compression level for subsequent files.
    pub fn set_compression(&mut self, level: ZipCompressionLevel) {
        self.compression = level;
    }

    /// Add a file to the archive.
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.add_file_with_options(name, data, self.compression)
    }

    /// Add a file with specific compression.
    pub fn add_file_with_options(
        &mut self,
        name: &str,
        data: &[u8],
        compression: ZipCompressionLevel,
    ) -> Result<()> {
        let crc32 = Crc32::compute(data);
        let (mtime, mdate) = Self::current_dos_time();
        let (compressed_data, method) = Self::compress_for_level(data, compression)?;
        let version_needed: u16 = if method == 8 { 20 } else { 10 };

        self.write_local_entry(
            name,
            version_needed,
            0,
            method,
            mtime,
            mdate,
            crc32,
            &compressed_data,
            data.len() as u64,
            0o100644 << 16,
        )
    }

    /// Add a password-protected file to the archive, encrypted with ZipCrypto.
    ///
    /// ZipCrypto is a weak, legacy cipher (see [`super::crypto`]'s module
    /// docs); this exists for interoperability with tools that expect a
    /// password-protected ZIP, not as a security boundary.
    pub fn add_file_with_password(&mut self, name: &str, data: &[u8], password: &[u8]) -> Result<()> {
        self.add_file_with_password_and_options(name, data, password, self.compression)
    }

    /// Add a password-protected file with specific compression.
    pub fn add_file_with_password_and_options(
        &mut self,
        name: &str,
        data: &[u8],
        password: &[u8],
        compression: ZipCompressionLevel,
    ) -> Result<()> {
        let crc32 = Crc32::compute(data);
        let (mtime, mdate) = Self::current_dos_time();
        let (compressed_data, method) = Self::compress_for_level(data, compression)?;

        let mut cipher = super::crypto::ZipCrypto::new(password);
        let seed1 = u64::from(crc32) ^ (u64::from(mtime) << 16 | u64::from(mdate));
        let seed2 = self.offset ^ (data.len() as u64).rotate_left(32);
        let header = cipher.generate_header_seeded(crc32, seed1, seed2);

        let mut encrypted =
            Vec::with_capacity(super::crypto::ENCRYPTION_HEADER_SIZE + compressed_data.len());
        encrypted.extend_from_slice(&header);
        let mut compressed_data = compressed_data;
        cipher.encrypt_buffer(&mut compressed_data);
        encrypted.extend_from_slice(&compressed_data);

        let version_needed: u16 = if method == 8 { 20 } else { 10 }.max(20);

        self.write_local_entry(
            name,
            version_needed,
            super::crypto::FLAG_ENCRYPTED,
            method,
            mtime,
            mdate,
            crc32,
            &encrypted,
            data.len() as u64,
            0o100644 << 16,
        )
    }

    /// Compress `data` at the given level, falling back to storing it
    /// uncompressed when compression doesn't actually shrink it.
    fn compress_for_level(
        data: &[u8],
        compression: ZipCompressionLevel,
    ) -> Result<(Vec<u8>, u16)> {
        Ok(match compression {
            ZipCompressionLevel::Store => (data.to_vec(), 0),
            ZipCompressionLevel::Fast => Self::deflate_or_store(data, 1)?,
            ZipCompressionLevel::Normal => Self::deflate_or_store(data, 6)?,
            ZipCompressionLevel::Best => Self::deflate_or_store(data, 9)?,
        })
    }

    fn deflate_or_store(data: &[u8], level: u8) -> Result<(Vec<u8>, u16)> {
        let compressed = deflate(data, level)?;
        Ok(if compressed.len() < data.len() {
            (compressed, 8)
        } else {
            (data.to_vec(), 0)
        })
    }

    /// Write a local file header plus its (already compressed, and possibly
    /// encrypted) data, and record the matching central directory entry.
    #[allow(clippy::too_many_arguments)]
    fn write_local_entry(
        &mut self,
        name: &str,
        version_needed: u16,
        flags: u16,
        method: u16,
        mtime: u16,
        mdate: u16,
        crc32: u32,
        stored_data: &[u8],
        uncompressed_size: u64,
        external_attr: u32,
    ) -> Result<()> {
        let compressed_size = stored_data.len() as u64;
        let local_header_offset = self.offset;

        if compressed_size >= ZIP64_MARKER_32 as u64
            || uncompressed_size >= ZIP64_MARKER_32 as u64
            || local_header_offset >= ZIP64_MARKER_32 as u64
        {
            return Err(FlateZipError::unsupported_feature("Zip64"));
        }
        let compressed_size = compressed_size as u32;
        let uncompressed_size = uncompressed_size as u32;

        let filename_bytes = name.as_bytes();

        self.writer
            .write_all(&LOCAL_FILE_HEADER_SIG.to_le_bytes())?;
        self.writer.write_all(&version_needed.to_le_bytes())?;
        self.writer.write_all(&flags.to_le_bytes())?;
        self.writer.write_all(&method.to_le_bytes())?;
        self.writer.write_all(&mtime.to_le_bytes())?;
        self.writer.write_all(&mdate.to_le_bytes())?;
        self.writer.write_all(&crc32.to_le_bytes())?;
        self.writer.write_all(&compressed_size.to_le_bytes())?;
        self.writer.write_all(&uncompressed_size.to_le_bytes())?;
        self.writer
            .write_all(&(filename_bytes.len() as u16).to_le_bytes())?;
        self.writer.write_all(&0u16.to_le_bytes())?;
        self.writer.write_all(filename_bytes)?;
        self.writer.write_all(stored_data)?;

        self.offset += 30 + filename_bytes.len() as u64 + stored_data.len() as u64;

        self.entries.push(CentralDirEntry {
            version_made_by: 0x031E, // Unix, version 3.0
            version_needed,
            flags,
            method,
            mtime,
            mdate,
            crc32,
            compressed_size,
            uncompressed_size,
            filename: name.to_string(),
            extra: Vec::new(),
            comment: String::new(),
            disk_start: 0,
            internal_attr: 0,
            external_attr,
            local_header_offset,
        });

        Ok(())
    }

    /// Add a directory to the archive.
    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        // Ensure directory name ends with /
        let dir_name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{}/", name)
        };

        let (mtime, mdate) = Self::current_dos_time();
        let local_header_offset = self.offset;
        let filename_bytes = dir_name.as_bytes();

        // Write local file header for directory
        self.writer
            .write_all(&LOCAL_FILE_HEADER_SIG.to_le_bytes())?;
        self.writer.write_all(&10u16.to_le_bytes())?; // Version needed
        self.writer.write_all(&0u16.to_le_bytes())?; // Flags
        self.writer.write_all(&0u16.to_le_bytes())?; // Method (stored)
        self.writer.write_all(&mtime.to_le_bytes())?;
        self.writer.write_all(&mdate.to_le_bytes())?;
        self.writer.write_all(&0u32.to_le_bytes())?; // CRC-32
        self.writer.write_all(&0u32.to_le_bytes())?; // Compressed size
        self.writer.write_all(&0u32.to_le_bytes())?; // Uncompressed size
        self.writer
            .write_all(&(filename_bytes.len() as u16).to_le_bytes())?;
        self.writer.write_all(&0u16.to_le_bytes())?; // Extra field length
        self.writer.write_all(filename_bytes)?;

        self.offset += 30 + filename_bytes.len() as u64;

        // Store central directory entry
        self.entries.push(CentralDirEntry {
            version_made_by: 0x031E,
            version_needed: 10,
            flags: 0,
            method: 0,
            mtime,
            mdate,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            filename: dir_name,
            extra: Vec::new(),
            comment: String::new(),
            disk_start: 0,
            internal_attr: 0,
            external_attr: 0o40755 << 16, // Directory, rwxr-xr-x
            local_header_offset,
        });

        Ok(())
    }

    /// Finish writing the archive.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        let central_dir_offset = self.offset;
        let mut central_dir_size = 0u64;

        // Write central directory
        for entry in &self.entries {
            let entry_size = entry.written_size() as u64;
            central_dir_size += entry_size;
            entry.write(&mut self.writer)?;
        }

        let num_entries = self.entries.len() as u64;
        if num_entries > ZIP64_MARKER_16 as u64
            || central_dir_size >= ZIP64_MARKER_32 as u64
            || central_dir_offset >= ZIP64_MARKER_32 as u64
        {
            return Err(FlateZipError::unsupported_feature("Zip64"));
        }
        let num_entries_16 = num_entries as u16;
        let central_dir_size_32 = central_dir_size as u32;
        let central_dir_offset_32 = central_dir_offset as u32;

        // Write End of Central Directory record
        self.writer
            .write_all(&END_OF_CENTRAL_DIR_SIG.to_le_bytes())?;
        // Disk number
        self.writer.write_all(&0u16.to_le_bytes())?;
        // Disk with central directory
        self.writer.write_all(&0u16.to_le_bytes())?;
        // Number of entries on this disk
        self.writer.write_all(&num_entries_16.to_le_bytes())?;
        // Total number of entries
        self.writer.write_all(&num_entries_16.to_le_bytes())?;
        // Size of central directory
        self.writer.write_all(&central_dir_size_32.to_le_bytes())?;
        // Offset of central directory
        self.writer
            .write_all(&central_dir_offset_32.to_le_bytes())?;
        // Comment length
        self.writer.write_all(&0u16.to_le_bytes())?;

        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Consume the writer and return the inner writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        // Use ManuallyDrop to prevent Drop from running
        let this = std::mem::ManuallyDrop::new(self);
        Ok(unsafe { std::ptr::read(&this.writer) })
    }

    /// Get current time in DOS format.
    fn current_dos_time() -> (u16, u16) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);

        // Convert to DOS time (simplified)
        let secs = now.as_secs();
        let days = secs / 86400;
        let time_of_day = secs % 86400;

        let hours = (time_of_day / 3600) as u16;
        let minutes = ((time_of_day % 3600) / 60) as u16;
        let seconds = ((time_of_day % 60) / 2) as u16; // DOS stores in 2-second increments

        let mtime = (hours << 11) | (minutes << 5) | seconds;

        // Approximate date calculation (days since 1970-01-01)
        let years = days / 365;
        let year = (1970 + years) as u16;
        let day_of_year = days % 365;
        let month = ((day_of_year / 30) + 1) as u16;
        let day = ((day_of_year % 30) + 1) as u16;

        let mdate = if year >= 1980 {
            ((year - 1980) << 9) | (month << 5) | day
        } else {
            0 // Before DOS epoch
        };

        (mtime, mdate)
    }
}

impl<W: Write> Drop for ZipWriter<W> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_compression_method() {
        assert_eq!(CompressionMethod::from_u16(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_u16(8), CompressionMethod::Deflate);
        assert!(matches!(
            CompressionMethod::from_u16(99),
            CompressionMethod::Unknown(99)
        ));
    }

    #[test]
    fn test_zip_writer_single_file() {
        let mut output = Vec::new();
        {
            let mut writer = ZipWriter::new(&mut output);
            writer.add_file("hello.txt", b"Hello, World!").unwrap();
            writer.finish().unwrap();
        }

        // Read back
        let cursor = Cursor::new(output);
        let mut reader = ZipReader::new(cursor).unwrap();

        assert_eq!(reader.entries().len(), 1);
        let entry = reader.entries()[0].clone();
        assert_eq!(entry.name, "hello.txt");
        assert_eq!(entry.size, 13);

        let data = reader.extract(&entry, true).unwrap();
        assert_eq!(&data, b"Hello, World!");
    }

    #[test]
    fn test_zip_writer_stored() {
        let mut output = Vec::new();
        {
            let mut writer = ZipWriter::new(&mut output);
            writer
                .add_file_with_options("test.bin", b"short", ZipCompressionLevel::Store)
                .unwrap();
            writer.finish().unwrap();
        }

        let cursor = Cursor::new(output);
        let mut reader = ZipReader::new(cursor).unwrap();

        let entry = reader.entries()[0].clone();
        assert_eq!(entry.method, CoreMethod::Stored);

        let data = reader.extract(&entry, true).unwrap();
        assert_eq!(&data, b"short");
    }

    #[test]
    fn test_zip_writer_multiple_files() {
        let mut output = Vec::new();
        {
            let mut writer = ZipWriter::new(&mut output);
            writer.add_file("file1.txt", b"Content 1").unwrap();
            writer
                .add_file("file2.txt", b"Content 2 is longer")
                .unwrap();
            writer.add_file("empty.txt", b"").unwrap();
            writer.finish().unwrap();
        }

        let cursor = Cursor::new(output);
        let mut reader = ZipReader::new(cursor).unwrap();

        assert_eq!(reader.entries().len(), 3);
        assert_eq!(reader.entries()[0].name, "file1.txt");
        assert_eq!(reader.entries()[1].name, "file2.txt");
        assert_eq!(reader.entries()[2].name, "empty.txt");

        let data1 = reader.extract(&reader.entries()[0].clone(), true).unwrap();
        let data2 = reader.extract(&reader.entries()[1].clone(), true).unwrap();
        let data3 = reader.extract(&reader.entries()[2].clone(), true).unwrap();

        assert_eq!(&data1, b"Content 1");
        assert_eq!(&data2, b"Content 2 is longer");
        assert_eq!(&data3, b"");
    }

    #[test]
    fn test_zip_writer_directory() {
        let mut output = Vec::new();
        {
            let mut writer = ZipWriter::new(&mut output);
            writer.add_directory("mydir").unwrap();
            writer
                .add_file("mydir/file.txt", b"Inside directory")
                .unwrap();
            writer.finish().unwrap();
        }

        let cursor = Cursor::new(output);
        let reader = ZipReader::new(cursor).unwrap();

        assert_eq!(reader.entries().len(), 2);
        assert_eq!(reader.entries()[0].name, "mydir/");
        assert!(reader.entries()[0].is_dir());
        assert_eq!(reader.entries()[1].name, "mydir/file.txt");
        assert!(reader.entries()[1].is_file());
    }

    #[test]
    fn test_zip_roundtrip_compressed() {
        // Create compressible data
        let data = "This is a test string that repeats. ".repeat(100);
        let data_bytes = data.as_bytes();

        let mut output = Vec::new();
        {
            let mut writer = ZipWriter::new(&mut output);
            writer.add_file("large.txt", data_bytes).unwrap();
            writer.finish().unwrap();
        }

        let cursor = Cursor::new(output);
        let mut reader = ZipReader::new(cursor).unwrap();

        let entry = reader.entries()[0].clone();
        // Should be compressed (smaller than original)
        assert!(entry.compressed_size < entry.size);
        assert_eq!(entry.method, CoreMethod::Deflate);

        let extracted = reader.extract(&entry, true).unwrap();
        assert_eq!(extracted, data_bytes);
    }

    #[test]
    fn test_zip64_marker_rejected_in_local_header() {
        let mut data = vec![
            0x50, 0x4B, 0x03, 0x04, // signature
            20, 0, // version needed
            0, 0, // flags
            0, 0, // method
            0, 0, // mtime
            0, 0, // mdate
            0, 0, 0, 0, // crc32
        ];
        data.extend_from_slice(&ZIP64_MARKER_32.to_le_bytes()); // compressed size
        data.extend_from_slice(&ZIP64_MARKER_32.to_le_bytes()); // uncompressed size
        data.extend_from_slice(&0u16.to_le_bytes()); // filename length
        data.extend_from_slice(&0u16.to_le_bytes()); // extra length

        let mut cursor = Cursor::new(data);
        let err = LocalFileHeader::read(&mut cursor).unwrap_err();
        assert!(matches!(err, FlateZipError::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_data_descriptor_with_signature() {
        // Data descriptor with signature
        let data = [
            0x50, 0x4B, 0x07, 0x08, // Signature
            0x12, 0x34, 0x56, 0x78, // CRC-32
            0x00, 0x10, 0x00, 0x00, // Compressed size (4096)
            0x00, 0x20, 0x00, 0x00, // Uncompressed size (8192)
        ];

        let mut cursor = Cursor::new(data);
        let (descriptor, bytes) = DataDescriptor::read(&mut cursor).unwrap();

        assert_eq!(bytes, 16); // 4 (sig) + 4 (crc) + 4 (comp) + 4 (uncomp)
        assert_eq!(descriptor.crc32, 0x78563412);
        assert_eq!(descriptor.compressed_size, 4096);
        assert_eq!(descriptor.uncompressed_size, 8192);
    }

    #[test]
    fn test_data_descriptor_without_signature() {
        // Data descriptor without signature
        let data = [
            0x12, 0x34, 0x56, 0x78, // CRC-32 (no signature)
            0x00, 0x10, 0x00, 0x00, // Compressed size (4096)
            0x00, 0x20, 0x00, 0x00, // Uncompressed size (8192)
        ];

        let mut cursor = Cursor::new(data);
        let (descriptor, bytes) = DataDescriptor::read(&mut cursor).unwrap();

        assert_eq!(bytes, 12); // 4 (crc) + 4 (comp) + 4 (uncomp)
        assert_eq!(descriptor.crc32, 0x78563412);
        assert_eq!(descriptor.compressed_size, 4096);
        assert_eq!(descriptor.uncompressed_size, 8192);
    }

    #[test]
    fn test_local_header_has_data_descriptor() {
        let header = LocalFileHeader {
            version_needed: 20,
            flags: FLAG_DATA_DESCRIPTOR, // Bit 3 set
            method: CompressionMethod::Deflate,
            mtime: 0,
            mdate: 0,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            filename: "test.txt".to_string(),
            extra: Vec::new(),
            data_offset: 0,
        };
        assert!(header.has_data_descriptor());

        let header_no_dd = LocalFileHeader {
            flags: 0, // No data descriptor
            ..header
        };
        assert!(!header_no_dd.has_data_descriptor());
    }
}
