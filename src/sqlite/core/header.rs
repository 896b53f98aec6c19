//! SQLite Database Header Implementation
//!
//! Handles parsing of the SQLite database header (first 100 bytes of the file)
//! according to the file format specification.
//!
//! ## Database Header Format (First 100 bytes)
//!
//! - Bytes 0-15: Header string "SQLite format 3\0"
//! - Bytes 16-17: Page size in bytes (big-endian, 1 means 65536)
//! - Byte 18: File format write version
//! - Byte 19: File format read version
//! - Byte 20: Reserved space at end of each page
//! - Bytes 21-23: Maximum embedded payload fraction, minimum embedded payload fraction, leaf payload fraction
//! - Bytes 24-27: File change counter
//! - Bytes 28-31: Size of database file in pages
//! - Bytes 32-35: First freelist trunk page
//! - Bytes 36-39: Total number of freelist pages
//! - Bytes 40-43: Schema cookie
//! - Bytes 44-47: Schema format number
//! - Bytes 48-51: Default page cache size
//! - Bytes 52-55: Largest root b-tree page number
//! - Bytes 56-59: Database text encoding (1:UTF-8, 2:UTF-16le, 3:UTF-16be)
//! - Bytes 60-63: User version
//! - Bytes 64-67: Incremental vacuum mode
//! - Bytes 68-71: Application ID
//! - Bytes 72-91: Reserved for expansion
//! - Bytes 92-95: Version-valid-for number
//! - Bytes 96-99: SQLite version number

use crate::sqlite::error::{SqliteError, SqliteResult};
use std::fmt::Display;
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Text encoding declared by the database header
///
/// Passed explicitly to the record decoder; there is no process-wide setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TryFrom<u32> for TextEncoding {
    type Error = SqliteError;

    fn try_from(value: u32) -> SqliteResult<Self> {
        match value {
            1 => Ok(TextEncoding::Utf8),
            2 => Ok(TextEncoding::Utf16Le),
            3 => Ok(TextEncoding::Utf16Be),
            other => Err(SqliteError::UnsupportedEncoding(other)),
        }
    }
}

impl Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "UTF-8"),
            TextEncoding::Utf16Le => write!(f, "UTF-16le"),
            TextEncoding::Utf16Be => write!(f, "UTF-16be"),
        }
    }
}

/// Represents the SQLite database header (first 100 bytes)
#[derive(Debug, Clone)]
pub struct DatabaseHeader {
    /// Page size in bytes (bytes 16-17), already resolved so 1 reads as 65536
    pub page_size: u32,
    /// File format write version (byte 18)
    pub write_version: u8,
    /// File format read version (byte 19)
    pub read_version: u8,
    /// Reserved space at end of each page (byte 20)
    pub reserved_space: u8,
    /// Maximum embedded payload fraction (byte 21)
    pub max_payload_fraction: u8,
    /// Minimum embedded payload fraction (byte 22)
    pub min_payload_fraction: u8,
    /// Leaf payload fraction (byte 23)
    pub leaf_payload_fraction: u8,
    /// File change counter (bytes 24-27)
    pub file_change_counter: u32,
    /// Size of database file in pages (bytes 28-31)
    pub database_size: u32,
    /// First freelist trunk page (bytes 32-35)
    pub first_freelist_trunk: u32,
    /// Total number of freelist pages (bytes 36-39)
    pub total_freelist_pages: u32,
    /// Schema cookie (bytes 40-43)
    pub schema_cookie: u32,
    /// Schema format number (bytes 44-47)
    pub schema_format: u32,
    /// Default page cache size (bytes 48-51)
    pub page_cache_size: u32,
    /// Largest root b-tree page number (bytes 52-55)
    pub largest_root_page: u32,
    /// Database text encoding (bytes 56-59)
    pub text_encoding: TextEncoding,
    /// User version (bytes 60-63)
    pub user_version: u32,
    /// Incremental vacuum mode (bytes 64-67)
    pub incremental_vacuum: u32,
    /// Application ID (bytes 68-71)
    pub application_id: u32,
    /// Version valid for number (bytes 92-95)
    pub version_valid_for: u32,
    /// SQLite version number (bytes 96-99)
    pub sqlite_version_number: u32,
}

impl DatabaseHeader {
    /// Size of the SQLite database header in bytes
    pub const HEADER_SIZE: usize = 100;

    /// Magic string that should appear at the start of every SQLite file
    const MAGIC_STRING: &'static [u8] = b"SQLite format 3\0";

    const MIN_PAGE_SIZE: u32 = 512;
    const MAX_PAGE_SIZE: u32 = 65536;

    /// Smallest usable page area the file format allows
    const MIN_USABLE_SIZE: u32 = 480;

    /// Reads and parses the header from the start of a byte source
    pub fn read<R: Read + Seek>(source: &mut R) -> SqliteResult<Self> {
        let mut header = [0u8; Self::HEADER_SIZE];
        source.seek(SeekFrom::Start(0))?;

        let mut filled = 0;
        while filled < Self::HEADER_SIZE {
            match source.read(&mut header[filled..])? {
                0 => break,
                n => filled += n,
            }
        }

        Self::parse(&header[..filled])
    }

    /// Parses a database header from raw bytes
    pub fn parse(header_bytes: &[u8]) -> SqliteResult<Self> {
        if header_bytes.len() < Self::HEADER_SIZE {
            return Err(SqliteError::TruncatedInput {
                needed: Self::HEADER_SIZE,
                available: header_bytes.len(),
            });
        }

        if &header_bytes[0..16] != Self::MAGIC_STRING {
            return Err(SqliteError::NotADatabaseFile);
        }

        let page_size = match u16::from_be_bytes([header_bytes[16], header_bytes[17]]) {
            1 => Self::MAX_PAGE_SIZE,
            raw => raw as u32,
        };
        if !page_size.is_power_of_two()
            || !(Self::MIN_PAGE_SIZE..=Self::MAX_PAGE_SIZE).contains(&page_size)
        {
            return Err(SqliteError::NotADatabaseFile);
        }

        let reserved_space = header_bytes[20];
        if page_size - (reserved_space as u32) < Self::MIN_USABLE_SIZE {
            return Err(SqliteError::NotADatabaseFile);
        }

        let header = DatabaseHeader {
            page_size,
            write_version: header_bytes[18],
            read_version: header_bytes[19],
            reserved_space,
            max_payload_fraction: header_bytes[21],
            min_payload_fraction: header_bytes[22],
            leaf_payload_fraction: header_bytes[23],
            file_change_counter: be_u32(header_bytes, 24),
            database_size: be_u32(header_bytes, 28),
            first_freelist_trunk: be_u32(header_bytes, 32),
            total_freelist_pages: be_u32(header_bytes, 36),
            schema_cookie: be_u32(header_bytes, 40),
            schema_format: be_u32(header_bytes, 44),
            page_cache_size: be_u32(header_bytes, 48),
            largest_root_page: be_u32(header_bytes, 52),
            text_encoding: TextEncoding::try_from(be_u32(header_bytes, 56))?,
            user_version: be_u32(header_bytes, 60),
            incremental_vacuum: be_u32(header_bytes, 64),
            application_id: be_u32(header_bytes, 68),
            version_valid_for: be_u32(header_bytes, 92),
            sqlite_version_number: be_u32(header_bytes, 96),
        };

        debug!(
            page_size = header.page_size,
            reserved_space = header.reserved_space,
            encoding = %header.text_encoding,
            "Parsed database header"
        );
        Ok(header)
    }

    /// Bytes of each page available to b-tree content
    pub fn usable_size(&self) -> usize {
        (self.page_size - self.reserved_space as u32) as usize
    }

    pub fn page_size(&self) -> usize {
        self.page_size as usize
    }

    pub fn text_encoding(&self) -> TextEncoding {
        self.text_encoding
    }
}

/// Reads a big-endian u32 at `offset`; callers guarantee the bounds
pub(crate) fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
