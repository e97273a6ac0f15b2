//! Conversion of sqlx errors to the gateway error kinds defined in
//! `dbchat_core`.
//!
//! The same `sqlx::Error` means different things depending on when it
//! happens: while connecting every failure is a connection error, while
//! executing only transport failures mean the connection is gone.

use dbchat_core::errors::GatewayError;

/// Error raised while opening a connection.
pub fn connect_error(err: sqlx::Error) -> GatewayError {
    let message = match &err {
        sqlx::Error::Database(db_err) => db_err.to_string(),
        other => other.to_string(),
    };
    GatewayError::Connection(message)
}

/// Error raised while running a statement on an open connection.
pub fn execute_error(err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::Database(db_err) => GatewayError::Query(db_err.to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::WorkerCrashed => GatewayError::ConnectionLost(err.to_string()),
        other => GatewayError::Query(other.to_string()),
    }
}
