use crate::sqlite::statement::Statement;
use crate::sqlite::SQLiteDatabase;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use itertools::Itertools;
use std::{convert::Infallible, fmt::Display, io::Write, path::PathBuf};
use tracing::debug;

/// Available commands for the SQLite CLI
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    DbInfo,
    Tables,
    /// Anything else is treated as SQL
    Query(String),
}

impl std::str::FromStr for Command {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ".dbinfo" => Ok(Command::DbInfo),
            ".tables" => Ok(Command::Tables),
            _ => Ok(Command::Query(s.to_string())),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::DbInfo => write!(f, ".dbinfo"),
            Command::Tables => write!(f, ".tables"),
            Command::Query(sql) => write!(f, "{}", sql),
        }
    }
}

/// Command line arguments for the SQLite CLI
#[derive(Debug, Parser)]
#[command(version, about = "Read metadata and row counts from a SQLite database file")]
pub struct Args {
    /// Path to the database file
    pub file: PathBuf,

    /// `.dbinfo`, `.tables`, or `SELECT COUNT(*) FROM <table>`
    pub command: String,

    /// Log more detail to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn command(&self) -> Command {
        match self.command.parse() {
            Ok(command) => command,
            Err(never) => match never {},
        }
    }

    /// Default log filter when `RUST_LOG` is not set
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Runs one command against the database and writes its result to `out`
///
/// Nothing is written unless the whole command succeeds.
pub fn run<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    let mut db = SQLiteDatabase::open(&args.file)
        .with_context(|| format!("failed to open database {}", args.file.display()))?;

    let command = args.command();
    debug!("Running command: {}", command);

    let output = match command {
        Command::DbInfo => {
            let info = db.get_info()?;
            format!(
                "database page size: {}\nnumber of tables: {}\n",
                info.page_size(),
                info.num_tables()
            )
        }
        Command::Tables => {
            let tables = db.list_tables()?;
            format!("{}\n", tables.iter().join(" "))
        }
        Command::Query(sql) => {
            let statement = Statement::parse(&sql)?;
            let result = db.execute(&statement)?;
            format!("{}\n", result)
        }
    };

    out.write_all(output.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(".dbinfo".parse::<Command>(), Ok(Command::DbInfo));
        assert_eq!(".tables".parse::<Command>(), Ok(Command::Tables));
        assert_eq!(
            "SELECT COUNT(*) FROM apples".parse::<Command>(),
            Ok(Command::Query("SELECT COUNT(*) FROM apples".to_string()))
        );
        assert_eq!(
            ".schema".parse::<Command>(),
            Ok(Command::Query(".schema".to_string()))
        );
    }

    #[test]
    fn test_args_from_command_line() {
        let args = Args::parse_from(["sqlite-reader", "sample.db", ".dbinfo"]);
        assert_eq!(args.file, PathBuf::from("sample.db"));
        assert_eq!(args.command(), Command::DbInfo);
        assert_eq!(args.log_level(), "warn");

        let args = Args::parse_from(["sqlite-reader", "-vv", "sample.db", ".tables"]);
        assert_eq!(args.log_level(), "debug");
    }

    #[test]
    fn test_missing_command_is_an_error() {
        assert!(Args::try_parse_from(["sqlite-reader", "sample.db"]).is_err());
    }
}
