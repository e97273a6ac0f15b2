use serde::{Deserialize, Serialize};
use std::fmt;

/// Database engine behind a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    #[default]
    MySql,
    /// `database` is a file path or `:memory:`; host and user are ignored.
    Sqlite,
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::MySql => write!(f, "mysql"),
            DatabaseKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Values entered in the connect form.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCredentials {
    #[serde(default)]
    pub kind: DatabaseKind,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

impl ConnectionCredentials {
    pub fn mysql(host: &str, user: &str, password: &str, database: &str) -> Self {
        Self {
            kind: DatabaseKind::MySql,
            host: host.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
        }
    }

    pub fn sqlite(path: &str) -> Self {
        Self {
            kind: DatabaseKind::Sqlite,
            database: path.to_string(),
            ..Default::default()
        }
    }

    /// Check the form is complete enough to attempt a connection.
    pub fn validate(&self) -> Result<(), String> {
        if self.database.trim().is_empty() {
            return Err("Database name is required".to_string());
        }
        if self.kind == DatabaseKind::MySql && self.host.trim().is_empty() {
            return Err("Host is required".to_string());
        }
        Ok(())
    }

    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            kind: self.kind,
            host: self.host.clone(),
            user: self.user.clone(),
            database: self.database.clone(),
        }
    }
}

impl fmt::Debug for ConnectionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCredentials")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// Connection details safe to show back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub kind: DatabaseKind,
    pub host: String,
    pub user: String,
    pub database: String,
}

/// Opaque schema text handed to the prompt pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaDescription(String);

impl SchemaDescription {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one executed statement, already rendered to text cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryOutput {
    /// A statement that produced a result set.
    #[serde(rename_all = "camelCase")]
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        /// Rows dropped because of the row limit.
        truncated: usize,
    },
    /// A statement that only modified data.
    #[serde(rename_all = "camelCase")]
    Affected { rows_affected: u64 },
}

impl QueryOutput {
    pub fn row_count(&self) -> usize {
        match self {
            QueryOutput::Rows {
                rows, truncated, ..
            } => rows.len() + truncated,
            QueryOutput::Affected { .. } => 0,
        }
    }
}

impl fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutput::Affected { rows_affected } => {
                let noun = if *rows_affected == 1 { "row" } else { "rows" };
                write!(f, "{} {} affected", rows_affected, noun)
            }
            QueryOutput::Rows { rows, .. } if rows.is_empty() => write!(f, "(no rows)"),
            QueryOutput::Rows {
                columns,
                rows,
                truncated,
            } => {
                writeln!(f, "{}", columns.join(" | "))?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", row.join(" | "))?;
                }
                if *truncated > 0 {
                    write!(f, "\n... ({} more rows not shown)", truncated)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let creds = ConnectionCredentials::mysql("localhost", "root", "hunter2", "shop");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("shop"));
    }

    #[test]
    fn test_validate_requires_host_for_mysql_only() {
        let creds = ConnectionCredentials::mysql("", "root", "", "shop");
        assert_eq!(creds.validate(), Err("Host is required".to_string()));

        let creds = ConnectionCredentials::sqlite("/tmp/shop.db");
        assert!(creds.validate().is_ok());

        let creds = ConnectionCredentials::sqlite("  ");
        assert!(creds.validate().is_err());
    }

    #[test]
    fn test_credentials_kind_defaults_to_mysql() {
        let creds: ConnectionCredentials = serde_json::from_str(
            r#"{"host":"localhost","user":"root","password":"pw","database":"shop"}"#,
        )
        .unwrap();
        assert_eq!(creds.kind, DatabaseKind::MySql);
        assert_eq!(creds.summary().database, "shop");
    }

    #[test]
    fn test_rows_display() {
        let output = QueryOutput::Rows {
            columns: vec!["id".into(), "name".into()],
            rows: vec![
                vec!["1".into(), "Alice".into()],
                vec!["2".into(), "Bob".into()],
            ],
            truncated: 3,
        };
        assert_eq!(
            output.to_string(),
            "id | name\n1 | Alice\n2 | Bob\n... (3 more rows not shown)"
        );
        assert_eq!(output.row_count(), 5);
    }

    #[test]
    fn test_empty_and_affected_display() {
        let empty = QueryOutput::Rows {
            columns: vec![],
            rows: vec![],
            truncated: 0,
        };
        assert_eq!(empty.to_string(), "(no rows)");
        assert_eq!(
            QueryOutput::Affected { rows_affected: 1 }.to_string(),
            "1 row affected"
        );
        assert_eq!(
            QueryOutput::Affected { rows_affected: 4 }.to_string(),
            "4 rows affected"
        );
    }
}
