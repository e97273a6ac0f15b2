//! Trust boundary between LLM-generated SQL and the database.
//!
//! Generated statements are executed verbatim by default (`TrustGeneratedSql`).
//! Any validation, allow-listing or rewriting of generated SQL belongs behind
//! the `SqlPolicy` trait so the session controller has a single place to ask.

use std::str::FromStr;
use std::sync::Arc;

use sqlparser::ast::{Query, SetExpr, Statement};

use crate::errors::SqlPolicyViolation;
use crate::gateway::DatabaseKind;
use crate::sql_text::{leading_keyword, parse_statements};

/// Decides whether a generated statement may reach the database.
pub trait SqlPolicy: Send + Sync {
    /// `kind` is the engine the statement will run on.
    fn review(&self, kind: DatabaseKind, sql: &str) -> Result<(), SqlPolicyViolation>;

    fn name(&self) -> &'static str;
}

/// Accepts every statement unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustGeneratedSql;

impl SqlPolicy for TrustGeneratedSql {
    fn review(&self, _kind: DatabaseKind, _sql: &str) -> Result<(), SqlPolicyViolation> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "trust"
    }
}

/// Only lets a single read statement through.
///
/// The text is parsed with the engine's dialect; anything that does not parse
/// is refused. Accepted: queries (including `WITH`) whose every part is a
/// plain read, `EXPLAIN` without `ANALYZE`, `DESCRIBE`, `SHOW TABLES`,
/// `SHOW COLUMNS` and `SHOW CREATE`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOnlySql;

impl SqlPolicy for ReadOnlySql {
    fn review(&self, kind: DatabaseKind, sql: &str) -> Result<(), SqlPolicyViolation> {
        let statements = parse_statements(kind, sql).map_err(|e| {
            SqlPolicyViolation::new(format!("could not parse generated SQL: {}", e))
        })?;

        match statements.as_slice() {
            [] => Err(SqlPolicyViolation::new("no statement to run")),
            [statement] if is_read_statement(statement) => Ok(()),
            [_] => {
                let keyword = leading_keyword(kind, sql).unwrap_or_else(|| "<none>".to_string());
                Err(SqlPolicyViolation::new(format!(
                    "only read statements are allowed, got {}",
                    keyword
                )))
            }
            _ => Err(SqlPolicyViolation::new(
                "multiple statements are not allowed",
            )),
        }
    }

    fn name(&self) -> &'static str {
        "read-only"
    }
}

fn is_read_statement(statement: &Statement) -> bool {
    match statement {
        Statement::Query(query) => is_read_query(query),
        // EXPLAIN ANALYZE runs the statement.
        Statement::Explain {
            analyze, statement, ..
        } => !*analyze && is_read_statement(statement),
        Statement::ExplainTable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. } => true,
        _ => false,
    }
}

fn is_read_query(query: &Query) -> bool {
    let ctes_read = match &query.with {
        Some(with) => with.cte_tables.iter().all(|cte| is_read_query(&cte.query)),
        None => true,
    };
    ctes_read && is_read_set_expr(&query.body)
}

fn is_read_set_expr(body: &SetExpr) -> bool {
    match body {
        // SELECT ... INTO writes a table or a file.
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Query(query) => is_read_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            is_read_set_expr(left) && is_read_set_expr(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        _ => false,
    }
}

/// Which policy the server applies, as read from configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SqlPolicyKind {
    #[default]
    Trust,
    ReadOnly,
}

impl SqlPolicyKind {
    pub fn build(self) -> Arc<dyn SqlPolicy> {
        match self {
            SqlPolicyKind::Trust => Arc::new(TrustGeneratedSql),
            SqlPolicyKind::ReadOnly => Arc::new(ReadOnlySql),
        }
    }
}

impl FromStr for SqlPolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust" | "" => Ok(SqlPolicyKind::Trust),
            "read-only" | "readonly" | "read_only" => Ok(SqlPolicyKind::ReadOnly),
            other => Err(format!(
                "unknown SQL policy '{}', expected 'trust' or 'read-only'",
                other
            )),
        }
    }
}
