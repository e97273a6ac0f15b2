use std::sync::Arc;

use crate::{
    error::ApiResult,
    main_lib::AppState,
    models::{MessageRequest, MessageResponse, SessionSnapshot},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dbchat_core::{ConnectionCredentials, Transcript};
use uuid::Uuid;

async fn create_session(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let entry = state.sessions.create()?;
    Ok((StatusCode::CREATED, Json(entry.snapshot())))
}

async fn get_session(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SessionSnapshot>> {
    let entry = state.sessions.get(id)?;
    Ok(Json(entry.snapshot()))
}

async fn delete_session(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.sessions.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn connect_session(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<ConnectionCredentials>,
) -> ApiResult<Json<SessionSnapshot>> {
    let entry = state.sessions.get(id)?;
    entry.connect(credentials).await?;
    Ok(Json(entry.snapshot()))
}

async fn list_messages(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Transcript>> {
    let entry = state.sessions.get(id)?;
    Ok(Json(entry.snapshot().transcript))
}

async fn send_message(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<MessageRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let entry = state.sessions.get(id)?;
    let (outcome, transcript) = entry.send_message(body.content).await?;
    Ok(Json(MessageResponse {
        sql: outcome.sql,
        result: outcome.result,
        answer: outcome.answer,
        transcript,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/connect", post(connect_session))
        .route(
            "/sessions/{id}/messages",
            get(list_messages).post(send_message),
        )
}
