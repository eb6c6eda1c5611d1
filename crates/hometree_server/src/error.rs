//! Error mapping from engine results to HTTP responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hometree_core::EngineError;
use log::error;
use serde::Serialize;

/// Application error type.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request or field validation failure.
    Validation(String),
    /// Target entity does not exist.
    NotFound(String),
    /// Referenced parent entity does not exist.
    ParentNotFound(String),
    /// Natural key already taken.
    DuplicateKey(String),
    /// Attempted change of an immutable identity field.
    ImmutableKey(String),
    /// Storage failure that slipped past engine validation, or a failed task.
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error flag.
    pub error: bool,
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            Self::ParentNotFound(msg) => (StatusCode::NOT_FOUND, "PARENT_NOT_FOUND", msg),
            Self::DuplicateKey(msg) => (StatusCode::BAD_REQUEST, "DUPLICATE_KEY", msg),
            Self::ImmutableKey(msg) => (StatusCode::BAD_REQUEST, "IMMUTABLE_KEY", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            error!(
                "event=http_error module=http status={} code={} error={}",
                status.as_u16(),
                code,
                message
            );
        }

        let body = ErrorResponse {
            error: true,
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::Validation(_) => Self::Validation(message),
            EngineError::NotFound { .. } => Self::NotFound(message),
            EngineError::ParentNotFound { .. } => Self::ParentNotFound(message),
            EngineError::DuplicateKey { .. } => Self::DuplicateKey(message),
            EngineError::ImmutableKey { .. } => Self::ImmutableKey(message),
            EngineError::Storage(_) => Self::Internal(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(format!("invalid query: {}", rejection.body_text()))
    }
}
