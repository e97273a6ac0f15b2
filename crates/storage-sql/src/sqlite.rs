use async_trait::async_trait;
use futures::TryStreamExt;
use log::debug;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Either, Row};
use std::str::FromStr;

use dbchat_core::errors::GatewayError;
use dbchat_core::gateway::{
    ConnectionCredentials, ConnectionSummary, DatabaseHandle, DatabaseKind, QueryOutput,
    SchemaDescription,
};

use crate::errors::execute_error;
use crate::gateway::{with_connect_timeout, GatewayOptions};
use crate::render::{column_names, sqlite_cell, ResultCollector};
use crate::schema::{clip_sample, join_blocks, quote_sqlite_ident, table_block};

const MEMORY_DATABASE: &str = ":memory:";

pub(crate) struct SqliteHandle {
    conn: SqliteConnection,
    summary: ConnectionSummary,
    options: GatewayOptions,
}

impl SqliteHandle {
    /// Open an existing database file. A missing file is a connection error,
    /// never an empty database created on the fly.
    pub(crate) async fn connect(
        credentials: &ConnectionCredentials,
        options: &GatewayOptions,
    ) -> Result<Self, GatewayError> {
        let path = credentials.database.trim();
        let connect_options = if path == MEMORY_DATABASE {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(crate::errors::connect_error)?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(false)
        };

        debug!("Opening SQLite database at '{}'", path);
        let conn = with_connect_timeout(options.connect_timeout, connect_options.connect()).await?;

        Ok(Self {
            conn,
            summary: credentials.summary(),
            options: options.clone(),
        })
    }

    async fn tables(&mut self) -> Result<Vec<(String, String)>, GatewayError> {
        let rows = sqlx::query(
            r#"
SELECT name, sql
FROM sqlite_master
WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
ORDER BY name
"#,
        )
        .fetch_all(&mut self.conn)
        .await
        .map_err(execute_error)?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("name").unwrap_or_default();
                let sql: Option<String> = row.try_get("sql").unwrap_or_default();
                (name, sql.unwrap_or_default())
            })
            .collect())
    }

    async fn samples(
        &mut self,
        table: &str,
    ) -> Result<(Vec<String>, Vec<Vec<String>>), GatewayError> {
        if self.options.sample_rows == 0 {
            return Ok((Vec::new(), Vec::new()));
        }
        let sample_sql = format!(
            "SELECT * FROM {} LIMIT {}",
            quote_sqlite_ident(table),
            self.options.sample_rows
        );
        let rows = sqlx::query(&sample_sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(execute_error)?;

        let columns = rows.first().map(column_names).unwrap_or_default();
        let samples = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|idx| clip_sample(sqlite_cell(row, idx)))
                    .collect()
            })
            .collect();
        Ok((columns, samples))
    }
}

#[async_trait]
impl DatabaseHandle for SqliteHandle {
    fn summary(&self) -> ConnectionSummary {
        self.summary.clone()
    }

    async fn describe_schema(&mut self) -> Result<SchemaDescription, GatewayError> {
        let tables = self.tables().await?;
        let mut blocks = Vec::with_capacity(tables.len());
        for (name, create_statement) in &tables {
            let (columns, samples) = self.samples(name).await?;
            blocks.push(table_block(name, create_statement, &columns, &samples));
        }
        debug!("Described {} SQLite tables", tables.len());
        Ok(SchemaDescription::new(join_blocks(blocks)))
    }

    async fn execute(&mut self, sql: &str) -> Result<QueryOutput, GatewayError> {
        let mut collector = ResultCollector::new(self.options.max_result_rows);
        {
            let mut stream = sqlx::raw_sql(sql).fetch_many(&mut self.conn);
            while let Some(step) = stream.try_next().await.map_err(execute_error)? {
                match step {
                    Either::Left(done) => collector.add_affected(done.rows_affected()),
                    Either::Right(row) => collector.push_row(column_names(&row), || {
                        (0..row.len()).map(|idx| sqlite_cell(&row, idx)).collect()
                    }),
                }
            }
        }
        Ok(collector.finish(DatabaseKind::Sqlite, sql))
    }
}
