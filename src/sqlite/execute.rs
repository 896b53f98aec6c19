//! SQL Statement Execution
//!
//! Runs a parsed [`Statement`] against a database. Row counts come straight
//! from the root page header, which is only the table's row count when the
//! whole table is a single leaf page; anything larger is refused.

use super::btree::PageType;
use super::db::SQLiteDatabase;
use super::error::{SqliteError, SqliteResult};
use super::statement::{Expression, Statement};
use std::fmt::Display;
use std::io::{Read, Seek};
use tracing::info;

/// Result of executing a SQL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteResult {
    /// Count result, used for COUNT(*) queries
    Count(u64),
}

impl Display for ExecuteResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ExecuteResult::Count(count) => write!(f, "{}", count),
        }
    }
}

impl<R: Read + Seek> SQLiteDatabase<R> {
    /// Executes a parsed SQL statement and returns the result
    pub fn execute(&mut self, stmt: &Statement) -> SqliteResult<ExecuteResult> {
        info!("Executing {:?}", stmt);
        match stmt.selection {
            Expression::CountAll => Ok(ExecuteResult::Count(self.count_rows(&stmt.from_table)?)),
        }
    }

    /// Counts the rows of a table stored in a single leaf page
    pub fn count_rows(&mut self, table_name: &str) -> SqliteResult<u64> {
        let catalog = self.schema()?;
        let entry = catalog.find(table_name)?;
        if !entry.is_table() {
            return Err(SqliteError::UnsupportedQuery(format!(
                "'{}' is a {}, not a table",
                table_name, entry.kind
            )));
        }
        info!("Root page for {}: {}", table_name, entry.root_page);

        let page = self.page_reader().read_page(entry.root_page)?;
        match page.page_type() {
            PageType::LeafTable => Ok(page.num_cells() as u64),
            PageType::InteriorTable => Err(SqliteError::UnsupportedQuery(format!(
                "table '{}' spans multiple pages",
                table_name
            ))),
            other => Err(SqliteError::UnsupportedPageType {
                page: page.number(),
                page_type: other.as_byte(),
            }),
        }
    }
}
