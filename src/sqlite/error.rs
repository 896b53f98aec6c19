//! Errors raised while decoding a database file.
//!
//! Every decoder returns these to its caller; only the command dispatcher turns
//! them into a message and an exit status.

use std::io;
use thiserror::Error;

pub type SqliteResult<T> = std::result::Result<T, SqliteError>;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("io error: {0}")]
    IoFailure(#[from] io::Error),

    #[error("truncated input: needed {needed} bytes but only {available} available")]
    TruncatedInput { needed: usize, available: usize },

    #[error("file is not a database")]
    NotADatabaseFile,

    #[error("unsupported text encoding: {0}")]
    UnsupportedEncoding(u32),

    #[error("corrupt page {page}: {reason}")]
    CorruptPage { page: u32, reason: String },

    #[error("unsupported page type {page_type:#04x} on page {page}")]
    UnsupportedPageType { page: u32, page_type: u8 },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("unsupported serial type: {0}")]
    UnsupportedSerialType(i64),

    #[error("no such table: {0}")]
    TableNotFound(String),

    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),
}

impl SqliteError {
    pub(crate) fn corrupt(page: u32, reason: impl Into<String>) -> Self {
        SqliteError::CorruptPage {
            page,
            reason: reason.into(),
        }
    }
}
