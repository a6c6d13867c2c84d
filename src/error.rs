//! 统一的请求错误类型与响应转换。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io::{self, ErrorKind};
use tracing::error;

pub const INTERNAL_ERROR_BODY: &str = "Internal server error.";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    NotImplemented(String),
    /// Detail is logged, never sent to the client.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg).into_response(),
            ApiError::Internal(detail) => {
                error!(error = %detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
            }
        }
    }
}

impl From<io::Error> for ApiError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => ApiError::NotFound("File not found".into()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("invalid json body: {err}"))
    }
}
