use chrono::{DateTime, Utc};
use dbchat_core::{ConnectionSummary, QueryOutput, SessionState, Transcript};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the page needs to render one session.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state: SessionState,
    pub connection: Option<ConnectionSummary>,
    pub transcript: Transcript,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub content: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub sql: String,
    pub result: QueryOutput,
    pub answer: String,
    pub transcript: Transcript,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub status: &'static str,
    pub llm: String,
    pub sql_policy: &'static str,
    pub sessions: usize,
}
