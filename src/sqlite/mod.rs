//! SQLite File Format Implementation
//!
//! Read-only decoding of database files: the file header, table leaf b-tree
//! pages with their overflow chains, records, and the `sqlite_schema`
//! catalog. Interior pages are recognized but never traversed.

pub mod btree;
pub mod core;
pub mod db;
pub mod error;
pub mod execute;
pub mod statement;
pub mod storage;

pub use db::{SQLiteDatabase, SQLiteDatabaseInfo};
pub use error::{SqliteError, SqliteResult};
