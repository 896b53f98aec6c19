pub mod cli;
pub mod sqlite;
