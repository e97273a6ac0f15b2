use async_trait::async_trait;
use log::info;
use std::time::Duration;

use dbchat_core::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_RESULT_ROWS, DEFAULT_SAMPLE_ROWS,
};
use dbchat_core::errors::GatewayError;
use dbchat_core::gateway::{ConnectionCredentials, DatabaseGateway, DatabaseHandle, DatabaseKind};

use crate::{mysql, sqlite};

/// Limits applied to every handle opened by a `SqlGateway`.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Rows rendered per result set; the rest are counted as truncated.
    pub max_result_rows: usize,
    /// Sample rows shown per table in the schema description. 0 disables them.
    pub sample_rows: usize,
    pub connect_timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            max_result_rows: DEFAULT_MAX_RESULT_ROWS,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// `DatabaseGateway` over sqlx, opening one dedicated connection per call.
#[derive(Debug, Clone, Default)]
pub struct SqlGateway {
    options: GatewayOptions,
}

impl SqlGateway {
    pub fn new(options: GatewayOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }
}

#[async_trait]
impl DatabaseGateway for SqlGateway {
    async fn connect(
        &self,
        credentials: &ConnectionCredentials,
    ) -> Result<Box<dyn DatabaseHandle>, GatewayError> {
        credentials
            .validate()
            .map_err(GatewayError::Connection)?;

        let handle: Box<dyn DatabaseHandle> = match credentials.kind {
            DatabaseKind::MySql => {
                Box::new(mysql::MySqlHandle::connect(credentials, &self.options).await?)
            }
            DatabaseKind::Sqlite => {
                Box::new(sqlite::SqliteHandle::connect(credentials, &self.options).await?)
            }
        };

        info!(
            "Connected to {} database '{}'",
            credentials.kind, credentials.database
        );
        Ok(handle)
    }
}

/// Run a connect future under the configured timeout.
pub(crate) async fn with_connect_timeout<T, F>(
    timeout: Duration,
    fut: F,
) -> Result<T, GatewayError>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(crate::errors::connect_error),
        Err(_) => Err(GatewayError::Connection(format!(
            "timed out after {}s",
            timeout.as_secs()
        ))),
    }
}
