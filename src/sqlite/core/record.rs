//! SQLite Record Format Implementation
//!
//! This module handles parsing SQLite records (rows) according to the file format specification.
//!
//! ## Record Format
//!
//! A record is the payload of a b-tree cell, already reassembled from any
//! overflow pages. It consists of:
//!
//! - A header containing:
//!   - Header size in bytes, including this varint (varint)
//!   - Serial type codes, one per column (sequence of varints)
//! - The column values, back to back, in header order
//!
//! The serial type codes in the header describe the data type and size of each field:
//!
//! - 0: NULL
//! - 1: 8-bit signed int
//! - 2: 16-bit signed int
//! - 3: 24-bit signed int
//! - 4: 32-bit signed int
//! - 5: 48-bit signed int
//! - 6: 64-bit signed int
//! - 7: IEEE 754 64-bit float
//! - 8: 0 (legacy)
//! - 9: 1 (legacy)
//! - 10,11: Internal use
//! - N >= 12 and even: BLOB of (N-12)/2 bytes
//! - N >= 13 and odd: Text of (N-13)/2 bytes
//!
//! Multi-byte numbers are big-endian regardless of the host.

use super::header::TextEncoding;
use super::varint::Varint;
use crate::sqlite::error::{SqliteError, SqliteResult};
use std::fmt::Display;
use tracing::trace;

/// Storage class and size of one column, read from a record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialType {
    Null,
    Int8,
    Int16,
    Int24,
    Int32,
    Int48,
    Int64,
    Float64,
    Zero,
    One,
    Blob(usize),
    Text(usize),
}

impl TryFrom<i64> for SerialType {
    type Error = SqliteError;

    fn try_from(code: i64) -> SqliteResult<Self> {
        Ok(match code {
            0 => SerialType::Null,
            1 => SerialType::Int8,
            2 => SerialType::Int16,
            3 => SerialType::Int24,
            4 => SerialType::Int32,
            5 => SerialType::Int48,
            6 => SerialType::Int64,
            7 => SerialType::Float64,
            8 => SerialType::Zero,
            9 => SerialType::One,
            n if n >= 12 && n % 2 == 0 => SerialType::Blob(((n - 12) / 2) as usize),
            n if n >= 13 => SerialType::Text(((n - 13) / 2) as usize),
            other => return Err(SqliteError::UnsupportedSerialType(other)),
        })
    }
}

impl SerialType {
    /// Number of body bytes the value occupies
    pub fn content_size(&self) -> usize {
        match self {
            SerialType::Null | SerialType::Zero | SerialType::One => 0,
            SerialType::Int8 => 1,
            SerialType::Int16 => 2,
            SerialType::Int24 => 3,
            SerialType::Int32 => 4,
            SerialType::Int48 => 6,
            SerialType::Int64 | SerialType::Float64 => 8,
            SerialType::Blob(len) | SerialType::Text(len) => *len,
        }
    }
}

/// A decoded column value
///
/// 24-bit integers widen to `Int32`, 48-bit integers to `Int64`, and the
/// constant serial types 8 and 9 decode to `Int8(0)` and `Int8(1)`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ColumnValue {
    /// Returns the value as an integer if it has an integer storage class
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ColumnValue::Int8(v) => Some(*v as i64),
            ColumnValue::Int16(v) => Some(*v as i64),
            ColumnValue::Int32(v) => Some(*v as i64),
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }
}

impl Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnValue::Null => Ok(()),
            ColumnValue::Int8(v) => write!(f, "{}", v),
            ColumnValue::Int16(v) => write!(f, "{}", v),
            ColumnValue::Int32(v) => write!(f, "{}", v),
            ColumnValue::Int64(v) => write!(f, "{}", v),
            ColumnValue::Float64(v) => write!(f, "{}", v),
            ColumnValue::Text(s) => write!(f, "{}", s),
            ColumnValue::Blob(bytes) => {
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// One decoded row, columns in schema order
pub type Row = Vec<ColumnValue>;

/// Parser for SQLite records (table rows)
pub struct Record<'a> {
    data: &'a [u8],
    position: usize,
    encoding: TextEncoding,
}

impl<'a> Record<'a> {
    pub fn new(data: &'a [u8], encoding: TextEncoding) -> Self {
        Self {
            data,
            position: 0,
            encoding,
        }
    }

    /// Decodes a complete record payload into its column values
    pub fn decode(payload: &'a [u8], encoding: TextEncoding) -> SqliteResult<Row> {
        let mut record = Self::new(payload, encoding);
        let serial_types = record.read_header()?;
        trace!("Serial types: {:?}", serial_types);

        serial_types
            .into_iter()
            .map(|serial_type| record.read_value(serial_type))
            .collect()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Reads the record header, leaving the cursor at the first body byte
    pub fn read_header(&mut self) -> SqliteResult<Vec<SerialType>> {
        let header_size = self.read_varint()?;
        if header_size < self.position as i64 || header_size as u64 > self.data.len() as u64 {
            return Err(SqliteError::MalformedRecord(format!(
                "header size {} does not fit payload of {} bytes",
                header_size,
                self.data.len()
            )));
        }
        let header_end = header_size as usize;

        let mut serial_types = Vec::new();
        while self.position < header_end {
            let code = self.read_varint()?;
            serial_types.push(SerialType::try_from(code)?);
        }

        if self.position != header_end {
            return Err(SqliteError::MalformedRecord(format!(
                "serial types overrun header of {} bytes",
                header_end
            )));
        }

        Ok(serial_types)
    }

    /// Reads the value for one serial type from the body
    pub fn read_value(&mut self, serial_type: SerialType) -> SqliteResult<ColumnValue> {
        let bytes = self.take(serial_type.content_size())?;

        Ok(match serial_type {
            SerialType::Null => ColumnValue::Null,
            SerialType::Zero => ColumnValue::Int8(0),
            SerialType::One => ColumnValue::Int8(1),
            SerialType::Int8 => ColumnValue::Int8(bytes[0] as i8),
            SerialType::Int16 => ColumnValue::Int16(i16::from_be_bytes([bytes[0], bytes[1]])),
            SerialType::Int24 => ColumnValue::Int32(read_signed(bytes) as i32),
            SerialType::Int32 => ColumnValue::Int32(i32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])),
            SerialType::Int48 | SerialType::Int64 => ColumnValue::Int64(read_signed(bytes)),
            SerialType::Float64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                ColumnValue::Float64(f64::from_be_bytes(raw))
            }
            SerialType::Blob(_) => ColumnValue::Blob(bytes.to_vec()),
            SerialType::Text(_) => ColumnValue::Text(decode_text(bytes, self.encoding)),
        })
    }

    fn read_varint(&mut self) -> SqliteResult<i64> {
        let (value, size) = self.data[self.position..].read_varint()?;
        self.position += size;
        Ok(value)
    }

    fn take(&mut self, size: usize) -> SqliteResult<&'a [u8]> {
        let available = self.data.len() - self.position;
        if size > available {
            return Err(SqliteError::TruncatedInput {
                needed: size,
                available,
            });
        }

        let data: &'a [u8] = self.data;
        let bytes = &data[self.position..self.position + size];
        self.position += size;
        Ok(bytes)
    }
}

/// Sign-extends a big-endian two's complement integer of 1-8 bytes
fn read_signed(bytes: &[u8]) -> i64 {
    let mut value: i64 = if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        -1
    } else {
        0
    };
    for &byte in bytes {
        value = (value << 8) | byte as i64;
    }
    value
}

/// Converts stored text into a Rust string
///
/// Invalid sequences and lone surrogates become U+FFFD; a dangling odd byte in
/// UTF-16 text is dropped.
fn decode_text(bytes: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Utf16Le => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        TextEncoding::Utf16Be => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
    }
}
