use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dbchat_core::errors::SessionError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Session(e) => {
                let status = match e {
                    SessionError::NotConnected | SessionError::Busy => StatusCode::CONFLICT,
                    SessionError::InvalidInput(_) | SessionError::Connection(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    SessionError::ConnectionLost(_) => StatusCode::SERVICE_UNAVAILABLE,
                    SessionError::Query(_) | SessionError::Rejected(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    SessionError::Llm(_) => StatusCode::BAD_GATEWAY,
                };
                (status, e.code())
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::warn!(kind, "{}", self);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            kind,
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
