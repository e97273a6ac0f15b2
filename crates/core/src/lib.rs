//! dbchat Core - conversation model, prompt pipeline and session state machine.
//!
//! This crate is driver- and provider-agnostic. It defines the traits that are
//! implemented by the `storage-sql` crate (database access) and the `ai` crate
//! (LLM completion).

pub mod constants;
pub mod conversation;
pub mod errors;
pub mod gateway;
pub mod llm;
pub mod prompts;
pub mod session;
pub mod sql_policy;
pub mod sql_text;

pub use conversation::{ConversationTurn, Transcript};
pub use errors::{GatewayError, LlmError, SessionError, SqlPolicyViolation};
pub use gateway::{
    ConnectionCredentials, ConnectionSummary, DatabaseGateway, DatabaseHandle, DatabaseKind,
    QueryOutput, SchemaDescription,
};
pub use llm::LlmClient;
pub use session::{SessionController, SessionOptions, SessionState, TurnOutcome};
pub use sql_policy::{ReadOnlySql, SqlPolicy, SqlPolicyKind, TrustGeneratedSql};
