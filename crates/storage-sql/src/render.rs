use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use dbchat_core::gateway::{DatabaseKind, QueryOutput};
use dbchat_core::sql_text::leading_keyword;

pub(crate) const NULL_TEXT: &str = "NULL";

/// Render one MySQL cell as text, whatever its column type.
pub(crate) fn mysql_cell(row: &MySqlRow, idx: usize) -> String {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return NULL_TEXT.to_string(),
        Ok(_) => {}
        Err(e) => return format!("<{}>", e),
    }

    if let Ok(v) = row.try_get::<String, _>(idx) {
        return v;
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<Decimal, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<f32, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
        return v.naive_utc().to_string();
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<NaiveTime, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
        return bytes_text(&v);
    }
    unsupported(row, idx)
}

/// Render one SQLite cell as text. SQLite reports the runtime storage class,
/// so four decoders cover every value.
pub(crate) fn sqlite_cell(row: &SqliteRow, idx: usize) -> String {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return NULL_TEXT.to_string(),
        Ok(_) => {}
        Err(e) => return format!("<{}>", e),
    }

    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return v;
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
        return bytes_text(&v);
    }
    unsupported(row, idx)
}

/// Text of a name-like cell (table names, DDL), tolerant of binary collations.
pub(crate) fn mysql_text(row: &MySqlRow, idx: usize) -> Option<String> {
    row.try_get::<String, _>(idx).ok().or_else(|| {
        row.try_get::<Vec<u8>, _>(idx)
            .ok()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    })
}

fn bytes_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<{} bytes>", bytes.len()),
    }
}

fn unsupported<R: Row>(row: &R, idx: usize) -> String {
    let type_name = row
        .columns()
        .get(idx)
        .map(|c| c.type_info().name().to_string())
        .unwrap_or_default();
    format!("<unsupported {}>", type_name)
}

pub(crate) fn column_names<R: Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Accumulates the outcome of one executed SQL text.
///
/// The first result set wins; rows past `max_rows` are only counted.
/// Statements that produce no rows contribute their affected-row counts.
pub(crate) struct ResultCollector {
    max_rows: usize,
    columns: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
    truncated: usize,
    rows_affected: u64,
}

impl ResultCollector {
    pub(crate) fn new(max_rows: usize) -> Self {
        Self {
            max_rows,
            columns: None,
            rows: Vec::new(),
            truncated: 0,
            rows_affected: 0,
        }
    }

    /// Register a row; `render` is only called for rows that are kept.
    pub(crate) fn push_row<F>(&mut self, names: Vec<String>, render: F)
    where
        F: FnOnce() -> Vec<String>,
    {
        match self.columns.as_ref().map(|first| *first == names) {
            None => self.columns = Some(names),
            Some(false) => return,
            Some(true) => {}
        }
        if self.rows.len() < self.max_rows {
            self.rows.push(render());
        } else {
            self.truncated += 1;
        }
    }

    pub(crate) fn add_affected(&mut self, n: u64) {
        self.rows_affected += n;
    }

    pub(crate) fn finish(self, kind: DatabaseKind, sql: &str) -> QueryOutput {
        match self.columns {
            Some(columns) => QueryOutput::Rows {
                columns,
                rows: self.rows,
                truncated: self.truncated,
            },
            None if returns_rows(kind, sql) => QueryOutput::Rows {
                columns: Vec::new(),
                rows: Vec::new(),
                truncated: 0,
            },
            None => QueryOutput::Affected {
                rows_affected: self.rows_affected,
            },
        }
    }
}

/// Whether a statement that yielded nothing should read as an empty result
/// set rather than "0 rows affected".
fn returns_rows(kind: DatabaseKind, sql: &str) -> bool {
    matches!(
        leading_keyword(kind, sql).as_deref(),
        Some("SELECT" | "WITH" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "PRAGMA" | "VALUES")
    )
}
