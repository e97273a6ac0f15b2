//! SQL storage implementation for dbchat.
//!
//! This crate is the only place where sqlx is used. It implements the
//! `DatabaseGateway` and `DatabaseHandle` traits defined in `dbchat-core`:
//! - Single connections to MySQL (host/user/password/database) and SQLite files
//! - Schema description as `CREATE TABLE` text plus a few sample rows per table
//! - Raw statement execution with every cell rendered to text
//!
//! ```text
//! core (session)
//!       │
//!       ▼
//! storage-sql (this crate)
//!       │
//!   ┌───┴────┐
//!   ▼        ▼
//! MySQL    SQLite
//! ```

pub mod errors;
pub mod gateway;
mod mysql;
mod render;
mod schema;
mod sqlite;

pub use gateway::{GatewayOptions, SqlGateway};
