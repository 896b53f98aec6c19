use crate::sqlite::error::{SqliteError, SqliteResult};

/// Longest possible varint encoding in bytes
pub const MAX_VARINT_LEN: usize = 9;

/// Largest value that still fits in eight 7-bit groups
const MAX_EIGHT_GROUP_VALUE: u64 = 0x00ff_ffff_ffff_ffff;

/// Utility functions for handling SQLite variable-length integers (varints)
///
/// A varint is 1-9 bytes long. The first eight bytes each contribute their low
/// 7 bits, most significant group first, and the high bit flags that another
/// byte follows. A ninth byte, if reached, contributes all 8 bits.
pub trait Varint {
    /// Reads a varint from the start of the slice, returning the value and the
    /// number of bytes consumed
    fn read_varint(&self) -> SqliteResult<(i64, usize)>;
}

impl Varint for [u8] {
    fn read_varint(&self) -> SqliteResult<(i64, usize)> {
        let mut result = 0u64;

        for (i, &byte) in self.iter().take(MAX_VARINT_LEN).enumerate() {
            if i == MAX_VARINT_LEN - 1 {
                result = (result << 8) | byte as u64;
                return Ok((result as i64, MAX_VARINT_LEN));
            }

            result = (result << 7) | (byte & 0x7f) as u64;
            if byte & 0x80 == 0 {
                return Ok((result as i64, i + 1));
            }
        }

        Err(SqliteError::TruncatedInput {
            needed: self.len() + 1,
            available: self.len(),
        })
    }
}

/// Encodes a value in the varint format, using the shortest form
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value > MAX_EIGHT_GROUP_VALUE {
        let mut out = vec![0u8; MAX_VARINT_LEN];
        out[MAX_VARINT_LEN - 1] = value as u8;
        let mut rest = value >> 8;
        for byte in out[..MAX_VARINT_LEN - 1].iter_mut().rev() {
            *byte = (rest & 0x7f) as u8 | 0x80;
            rest >>= 7;
        }
        return out;
    }

    let mut groups = Vec::with_capacity(MAX_VARINT_LEN - 1);
    let mut rest = value;
    loop {
        groups.push((rest & 0x7f) as u8);
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    groups.reverse();

    let last = groups.len() - 1;
    for byte in &mut groups[..last] {
        *byte |= 0x80;
    }
    groups
}
