//! Database Gateway module - connection credentials, result models and the
//! traits implemented by the `storage-sql` crate.

mod gateway_model;
mod gateway_traits;

pub use gateway_model::{
    ConnectionCredentials, ConnectionSummary, DatabaseKind, QueryOutput, SchemaDescription,
};
pub use gateway_traits::{DatabaseGateway, DatabaseHandle};
