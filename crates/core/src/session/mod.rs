//! Session module - the per-session state machine driving a question through
//! SQL generation, execution and answer generation.

mod session_controller;
mod session_model;

pub use session_controller::SessionController;
pub use session_model::{SessionOptions, SessionState, TurnOutcome};
