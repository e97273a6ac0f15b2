//! Core error types for dbchat.
//!
//! Driver- and provider-specific errors (sqlx, rig-core) are converted to
//! these types by the `storage-sql` and `ai` crates, keeping this crate
//! independent of both.

use thiserror::Error;

/// Errors raised at the Database Gateway boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Unreachable host, authentication failure or unknown database.
    #[error("Failed to connect to database: {0}")]
    Connection(String),

    /// The handle no longer refers to a live connection.
    #[error("Database connection lost: {0}")]
    ConnectionLost(String),

    /// The database rejected the statement. Carries the database's message.
    #[error("Query failed: {0}")]
    Query(String),
}

/// Errors raised at the LLM client boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The provider call failed (network, HTTP status, decoding).
    #[error("LLM provider error: {0}")]
    Provider(String),

    /// The provider answered with no usable text.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// No API key configured for the selected provider.
    #[error("Missing API key for provider {0}")]
    MissingApiKey(String),

    /// The client could not be configured.
    #[error("LLM configuration error: {0}")]
    Config(String),
}

/// Generated SQL refused by the active `SqlPolicy`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Generated SQL rejected: {reason}")]
pub struct SqlPolicyViolation {
    pub reason: String,
}

impl SqlPolicyViolation {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the Session Controller.
///
/// Every variant is recoverable: the controller is back in `Disconnected` or
/// `Connected` by the time one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A question was asked before any database was connected.
    #[error("Not connected to a database. Connect first.")]
    NotConnected,

    /// Another turn is still being processed for this session.
    #[error("A previous message is still being processed")]
    Busy,

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Connection(GatewayError),

    #[error(transparent)]
    ConnectionLost(GatewayError),

    #[error(transparent)]
    Query(GatewayError),

    #[error(transparent)]
    Rejected(#[from] SqlPolicyViolation),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl From<GatewayError> for SessionError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Connection(_) => SessionError::Connection(err),
            GatewayError::ConnectionLost(_) => SessionError::ConnectionLost(err),
            GatewayError::Query(_) => SessionError::Query(err),
        }
    }
}

/// Error code for programmatic handling by API consumers.
impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotConnected => "NOT_CONNECTED",
            SessionError::Busy => "BUSY",
            SessionError::InvalidInput(_) => "INVALID_INPUT",
            SessionError::Connection(_) => "CONNECTION_ERROR",
            SessionError::ConnectionLost(_) => "CONNECTION_LOST",
            SessionError::Query(_) => "QUERY_ERROR",
            SessionError::Rejected(_) => "SQL_REJECTED",
            SessionError::Llm(_) => "LLM_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_map_to_session_variants() {
        let err: SessionError = GatewayError::Query("Unknown column 'x'".into()).into();
        assert_eq!(err.code(), "QUERY_ERROR");
        assert_eq!(err.to_string(), "Query failed: Unknown column 'x'");

        let err: SessionError = GatewayError::Connection("Access denied".into()).into();
        assert!(matches!(err, SessionError::Connection(_)));

        let err: SessionError = GatewayError::ConnectionLost("broken pipe".into()).into();
        assert_eq!(err.code(), "CONNECTION_LOST");
    }

    #[test]
    fn test_llm_error_is_surfaced_verbatim() {
        let err: SessionError = LlmError::EmptyResponse.into();
        assert_eq!(err.code(), "LLM_ERROR");
        assert_eq!(err.to_string(), "LLM returned an empty response");
    }
}
