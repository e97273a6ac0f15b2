use std::sync::Arc;

use crate::{main_lib::AppState, models::ReadinessReport};
use axum::{extract::State, routing::get, Json, Router};

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<Arc<AppState>>) -> Json<ReadinessReport> {
    Json(ReadinessReport {
        status: "ok",
        llm: state.sessions.llm_label(),
        sql_policy: state.sessions.sql_policy_name(),
        sessions: state.sessions.len(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
