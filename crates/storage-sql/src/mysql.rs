use async_trait::async_trait;
use futures::TryStreamExt;
use log::debug;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Either, Row};

use dbchat_core::errors::GatewayError;
use dbchat_core::gateway::{
    ConnectionCredentials, ConnectionSummary, DatabaseHandle, DatabaseKind, QueryOutput,
    SchemaDescription,
};

use crate::errors::execute_error;
use crate::gateway::{with_connect_timeout, GatewayOptions};
use crate::render::{column_names, mysql_cell, mysql_text, ResultCollector};
use crate::schema::{clip_sample, join_blocks, quote_mysql_ident, table_block};

const DEFAULT_MYSQL_PORT: u16 = 3306;

pub(crate) struct MySqlHandle {
    conn: MySqlConnection,
    summary: ConnectionSummary,
    options: GatewayOptions,
}

impl MySqlHandle {
    pub(crate) async fn connect(
        credentials: &ConnectionCredentials,
        options: &GatewayOptions,
    ) -> Result<Self, GatewayError> {
        let (host, port) = split_host_port(&credentials.host)?;
        let connect_options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(&credentials.user)
            .password(&credentials.password)
            .database(&credentials.database);

        debug!("Opening MySQL connection to {}:{}", host, port);
        let conn = with_connect_timeout(options.connect_timeout, connect_options.connect()).await?;

        Ok(Self {
            conn,
            summary: credentials.summary(),
            options: options.clone(),
        })
    }

    async fn table_names(&mut self) -> Result<Vec<String>, GatewayError> {
        let rows = sqlx::query("SHOW FULL TABLES")
            .fetch_all(&mut self.conn)
            .await
            .map_err(execute_error)?;
        Ok(rows
            .iter()
            .filter(|row| mysql_text(row, 1).as_deref() != Some("VIEW"))
            .filter_map(|row| mysql_text(row, 0))
            .collect())
    }

    async fn describe_table(&mut self, table: &str) -> Result<String, GatewayError> {
        let quoted = quote_mysql_ident(table);
        let create = sqlx::query(&format!("SHOW CREATE TABLE {}", quoted))
            .fetch_one(&mut self.conn)
            .await
            .map_err(execute_error)?;
        let create_statement = mysql_text(&create, 1).unwrap_or_default();

        if self.options.sample_rows == 0 {
            return Ok(create_statement);
        }
        let sample_sql = format!(
            "SELECT * FROM {} LIMIT {}",
            quoted, self.options.sample_rows
        );
        let rows = sqlx::query(&sample_sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(execute_error)?;

        let columns = rows.first().map(column_names).unwrap_or_default();
        let samples: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|idx| clip_sample(mysql_cell(row, idx)))
                    .collect()
            })
            .collect();
        Ok(table_block(table, &create_statement, &columns, &samples))
    }
}

#[async_trait]
impl DatabaseHandle for MySqlHandle {
    fn summary(&self) -> ConnectionSummary {
        self.summary.clone()
    }

    async fn describe_schema(&mut self) -> Result<SchemaDescription, GatewayError> {
        let tables = self.table_names().await?;
        let mut blocks = Vec::with_capacity(tables.len());
        for table in &tables {
            blocks.push(self.describe_table(table).await?);
        }
        debug!("Described {} MySQL tables", tables.len());
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
                        (0..row.len()).map(|idx| mysql_cell(&row, idx)).collect()
                    }),
                }
            }
        }
        Ok(collector.finish(DatabaseKind::MySql, sql))
    }
}

impl Drop for MySqlHandle {
    fn drop(&mut self) {
        debug!("Releasing MySQL connection to '{}'", self.summary.database);
    }
}

/// Split `host[:port]`, defaulting to the standard MySQL port.
fn split_host_port(host: &str) -> Result<(&str, u16), GatewayError> {
    let host = host.trim();
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') => {
            let port = port
                .parse::<u16>()
                .map_err(|_| GatewayError::Connection(format!("Invalid port '{}'", port)))?;
            Ok((name, port))
        }
        _ => Ok((host, DEFAULT_MYSQL_PORT)),
    }
}
