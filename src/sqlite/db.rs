//! SQLite File Format Implementation
//!
//! A SQLite database file consists of one or more fixed-size pages, numbered
//! from 1. The first page contains:
//!
//! - Database header (100 bytes), see [`DatabaseHeader`]
//! - First page of the sqlite_schema table
//!
//! The header is read once when the file is opened. Its page size, reserved
//! space and text encoding then drive every later page and record read.

use crate::sqlite::btree::PageReader;
use crate::sqlite::core::header::DatabaseHeader;
use crate::sqlite::core::schema::SchemaCatalog;
use crate::sqlite::error::SqliteResult;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::info;

/// Represents an open SQLite database file
pub struct SQLiteDatabase<R = File> {
    /// The underlying random-access byte source
    source: R,
    header: DatabaseHeader,
}

/// Contains metadata about a SQLite database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SQLiteDatabaseInfo {
    /// Size of each page in bytes
    page_size: u32,
    /// Number of tables in the database
    num_tables: usize,
}

impl SQLiteDatabaseInfo {
    /// Returns the page size in bytes
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the number of tables in the database
    pub fn num_tables(&self) -> usize {
        self.num_tables
    }
}

impl SQLiteDatabase<File> {
    /// Opens a SQLite database file at the given path
    pub fn open(path: impl AsRef<Path>) -> SqliteResult<Self> {
        let path = path.as_ref();
        info!("Opening database {}", path.display());
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read + Seek> SQLiteDatabase<R> {
    /// Wraps an already opened byte source, reading its header
    pub fn from_reader(mut source: R) -> SqliteResult<Self> {
        let header = DatabaseHeader::read(&mut source)?;
        Ok(Self { source, header })
    }

    pub fn header(&self) -> &DatabaseHeader {
        &self.header
    }

    pub fn page_reader(&mut self) -> PageReader<'_, R> {
        PageReader::new(&mut self.source, &self.header)
    }

    /// Decodes the sqlite_schema table from page 1
    pub fn schema(&mut self) -> SqliteResult<SchemaCatalog> {
        let encoding = self.header.text_encoding();
        SchemaCatalog::load(&mut self.page_reader(), encoding)
    }

    /// Page size and number of tables
    pub fn get_info(&mut self) -> SqliteResult<SQLiteDatabaseInfo> {
        let num_tables = self.schema()?.list_tables().len();
        info!("Found {} tables", num_tables);

        Ok(SQLiteDatabaseInfo {
            page_size: self.header.page_size,
            num_tables,
        })
    }

    /// Lists user tables, hiding internal `sqlite_` tables
    pub fn list_tables(&mut self) -> SqliteResult<Vec<String>> {
        let catalog = self.schema()?;
        Ok(catalog
            .entries()
            .iter()
            .filter(|entry| entry.is_table() && !entry.is_internal())
            .map(|entry| entry.name.clone())
            .collect())
    }
}
