//! Conversation module - turns and the append-only transcript.

mod conversation_model;

pub use conversation_model::{ConversationTurn, Transcript};
