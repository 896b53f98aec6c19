//! SQL Statement Parser
//!
//! Only one query shape is understood:
//!
//! ```text
//! SELECT COUNT(*) FROM <table>
//! ```
//!
//! Keywords are case-insensitive, whitespace is free-form and a trailing `;`
//! is accepted. The table name is the final token; surrounding `"..."`,
//! `` `...` `` or `[...]` quoting is removed. Anything else is rejected as an
//! unsupported query.
//!
//! # Example
//! ```
//! use sqlite_reader::sqlite::statement::Statement;
//!
//! let stmt = Statement::parse("SELECT COUNT(*) FROM apples").unwrap();
//! assert_eq!(stmt.from_table, "apples");
//! ```

use crate::sqlite::error::{SqliteError, SqliteResult};
use nom::{
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt, value},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

/// Represents different types of selected expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression {
    /// `COUNT(*)`
    CountAll,
}

/// Represents a parsed SQL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// The expression to select
    pub selection: Expression,
    /// The table name to select from
    pub from_table: String,
}

impl Statement {
    /// Parses a SQL string into a Statement struct
    pub fn parse(sql: &str) -> SqliteResult<Self> {
        match all_consuming(select_statement)(sql) {
            Ok((_, statement)) => Ok(statement),
            Err(_) => Err(SqliteError::UnsupportedQuery(sql.trim().to_string())),
        }
    }
}

fn count_all(input: &str) -> IResult<&str, Expression> {
    value(
        Expression::CountAll,
        tuple((
            tag_no_case("count"),
            multispace0,
            char('('),
            multispace0,
            char('*'),
            multispace0,
            char(')'),
        )),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| !c.is_whitespace() && c != ';'),
        |token: &str| unquote(token).to_string(),
    )(input)
}

fn unquote(token: &str) -> &str {
    let quoted = [('"', '"'), ('`', '`'), ('[', ']')]
        .iter()
        .find(|(open, close)| {
            token.len() >= 2 && token.starts_with(*open) && token.ends_with(*close)
        });
    match quoted {
        Some(_) => &token[1..token.len() - 1],
        None => token,
    }
}

fn select_statement(input: &str) -> IResult<&str, Statement> {
    let (input, selection) = delimited(
        tuple((multispace0, tag_no_case("select"), multispace1)),
        count_all,
        tuple((multispace0, tag_no_case("from"), multispace1)),
    )(input)?;

    let (input, from_table) = terminated(
        identifier,
        tuple((multispace0, opt(preceded(char(';'), multispace0)))),
    )(input)?;

    Ok((
        input,
        Statement {
            selection,
            from_table,
        },
    ))
}
