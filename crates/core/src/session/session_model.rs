use serde::Serialize;

use crate::gateway::QueryOutput;

/// Where a session is in the connect / question / answer cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No database handle; questions are refused.
    Disconnected,
    /// Idle with a live handle; ready for the next question.
    Connected,
    /// Waiting for the model to produce SQL.
    AwaitingSql,
    /// SQL is executing or its result is being turned into an answer.
    AwaitingAnswer,
}

impl SessionState {
    /// True while a turn is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::AwaitingSql | SessionState::AwaitingAnswer)
    }
}

/// Per-session behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Reuse the schema text for the lifetime of a connection instead of
    /// fetching it again on every question.
    pub cache_schema: bool,
}

/// Everything produced by one successful turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// Statement that was executed.
    pub sql: String,
    pub result: QueryOutput,
    /// Text appended to the transcript as the AI turn.
    pub answer: String,
}
