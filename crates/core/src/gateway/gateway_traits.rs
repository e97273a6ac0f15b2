use async_trait::async_trait;

use crate::errors::GatewayError;
use crate::gateway::gateway_model::{
    ConnectionCredentials, ConnectionSummary, QueryOutput, SchemaDescription,
};

/// Opens database connections.
#[async_trait]
pub trait DatabaseGateway: Send + Sync {
    /// Establish one connection with the given credentials.
    ///
    /// No retry is attempted; unreachable hosts, rejected credentials and
    /// unknown databases surface immediately as `GatewayError::Connection`.
    async fn connect(
        &self,
        credentials: &ConnectionCredentials,
    ) -> Result<Box<dyn DatabaseHandle>, GatewayError>;
}

/// One open connection, exclusively owned by a session.
#[async_trait]
pub trait DatabaseHandle: Send {
    /// What this handle is connected to (never includes the password).
    fn summary(&self) -> ConnectionSummary;

    /// Table and column metadata as descriptive text.
    async fn describe_schema(&mut self) -> Result<SchemaDescription, GatewayError>;

    /// Execute SQL text as-is and render its outcome.
    ///
    /// No validation happens here; callers decide what is allowed through
    /// (see `crate::sql_policy`).
    async fn execute(&mut self, sql: &str) -> Result<QueryOutput, GatewayError>;
}
