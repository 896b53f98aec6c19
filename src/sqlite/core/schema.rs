//! The `sqlite_schema` catalog
//!
//! Page 1 holds the first (and, for the databases this crate reads, only)
//! leaf of the catalog table. Each row has five columns in order:
//!
//! - type: "table", "index", "view" or "trigger"
//! - name: name of the object
//! - tbl_name: table the object belongs to
//! - rootpage: page number of the root b-tree page (0 for views and triggers)
//! - sql: CREATE statement, NULL for automatic indexes

use super::header::TextEncoding;
use super::record::{ColumnValue, Record, Row};
use crate::sqlite::btree::PageReader;
use crate::sqlite::error::{SqliteError, SqliteResult};
use crate::sqlite::storage::table::Table;
use std::io::{Read, Seek};
use tracing::{debug, info};

/// A decoded `sqlite_schema` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    /// The `type` column
    pub kind: String,
    pub name: String,
    pub tbl_name: String,
    pub root_page: u32,
    pub sql: Option<String>,
}

impl SchemaEntry {
    const COLUMN_COUNT: usize = 5;

    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        if row.len() < Self::COLUMN_COUNT {
            return Err(SqliteError::MalformedRecord(format!(
                "schema row has {} columns, expected {}",
                row.len(),
                Self::COLUMN_COUNT
            )));
        }

        let kind = text_column(&row[0], "type")?;
        let name = text_column(&row[1], "name")?;
        let tbl_name = text_column(&row[2], "tbl_name")?;

        let root_page = match &row[3] {
            ColumnValue::Null => 0,
            value => value
                .as_integer()
                .and_then(|page| u32::try_from(page).ok())
                .ok_or_else(|| {
                    SqliteError::MalformedRecord(format!(
                        "rootpage of '{}' is not a page number: {:?}",
                        name, value
                    ))
                })?,
        };

        let sql = match &row[4] {
            ColumnValue::Null => None,
            value => Some(text_column(value, "sql")?),
        };

        let entry = SchemaEntry {
            kind,
            name,
            tbl_name,
            root_page,
            sql,
        };

        if entry.has_btree() && entry.root_page == 0 {
            return Err(SqliteError::MalformedRecord(format!(
                "{} '{}' has no root page",
                entry.kind, entry.name
            )));
        }

        Ok(entry)
    }

    pub fn is_table(&self) -> bool {
        self.kind == "table"
    }

    /// Tables and indexes own a b-tree; views and triggers do not
    pub fn has_btree(&self) -> bool {
        self.kind == "table" || self.kind == "index"
    }

    /// Internal tables such as `sqlite_sequence`
    pub fn is_internal(&self) -> bool {
        self.name.starts_with("sqlite_")
    }
}

fn text_column(value: &ColumnValue, column: &str) -> SqliteResult<String> {
    value.as_text().map(str::to_string).ok_or_else(|| {
        SqliteError::MalformedRecord(format!(
            "schema column {} is not text: {:?}",
            column, value
        ))
    })
}

/// All rows of `sqlite_schema`, in on-page (creation) order
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    rows: Table,
    entries: Vec<SchemaEntry>,
}

impl SchemaCatalog {
    /// The catalog b-tree is always rooted at page 1
    pub const ROOT_PAGE: u32 = 1;

    /// Reads page 1 and decodes every schema row
    pub fn load<R: Read + Seek>(
        reader: &mut PageReader<'_, R>,
        encoding: TextEncoding,
    ) -> SqliteResult<Self> {
        let rows = reader
            .read_cells(Self::ROOT_PAGE)?
            .iter()
            .map(|cell| Record::decode(&cell.payload, encoding))
            .collect::<SqliteResult<Table>>()?;

        let catalog = Self::from_rows(rows)?;
        info!("Loaded {} schema entries", catalog.entries.len());
        Ok(catalog)
    }

    pub fn from_rows(rows: Table) -> SqliteResult<Self> {
        let entries = rows
            .iter()
            .map(SchemaEntry::from_row)
            .collect::<SqliteResult<Vec<_>>>()?;
        for entry in &entries {
            debug!(
                kind = %entry.kind,
                name = %entry.name,
                root_page = entry.root_page,
                "Schema entry"
            );
        }

        Ok(Self { rows, entries })
    }

    /// The raw decoded `sqlite_schema` rows
    pub fn rows(&self) -> &Table {
        &self.rows
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// Names of every table, in creation order
    pub fn list_tables(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.is_table())
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// First entry whose `tbl_name` matches exactly (case-sensitive)
    pub fn find(&self, table_name: &str) -> SqliteResult<&SchemaEntry> {
        self.entries
            .iter()
            .find(|entry| entry.tbl_name == table_name)
            .ok_or_else(|| SqliteError::TableNotFound(table_name.to_string()))
    }
}
