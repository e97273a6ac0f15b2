//! SQL parsing helpers shared by the SQL policy and the gateways.
//!
//! Wraps sqlparser-rs with the dialect matching the connected engine.

use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect, SQLiteDialect};
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::gateway::DatabaseKind;

/// sqlparser dialect for a database engine.
pub fn dialect_for(kind: DatabaseKind) -> Box<dyn Dialect> {
    match kind {
        DatabaseKind::MySql => Box::new(MySqlDialect {}),
        DatabaseKind::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Parse every statement in `sql`. Blank input yields no statements.
pub fn parse_statements(kind: DatabaseKind, sql: &str) -> Result<Vec<Statement>, ParserError> {
    let dialect = dialect_for(kind);
    Parser::parse_sql(dialect.as_ref(), sql)
}

/// First keyword of the statement, upper-cased, skipping whitespace,
/// comments and opening parentheses.
///
/// Returns `None` when the text does not tokenize or starts with anything
/// other than a word.
pub fn leading_keyword(kind: DatabaseKind, sql: &str) -> Option<String> {
    let dialect = dialect_for(kind);
    let tokens = Tokenizer::new(dialect.as_ref(), sql).tokenize().ok()?;
    tokens
        .into_iter()
        .find(|token| !matches!(token, Token::Whitespace(_) | Token::LParen))
        .and_then(|token| match token {
            Token::Word(word) => Some(word.value.to_ascii_uppercase()),
            _ => None,
        })
}
