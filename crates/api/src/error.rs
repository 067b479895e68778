use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use convo_db::StoreError;
use convo_services::trigger::TriggerError;
use convo_services::{CallableError, ErrorCode};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    InvalidArgument(String),
    NotFound(String),
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidArgument, msg)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal, msg)
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                status: code.as_status(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CallableError> for ApiError {
    fn from(err: CallableError) -> Self {
        match err.code {
            ErrorCode::InvalidArgument => ApiError::InvalidArgument(err.message),
            ErrorCode::NotFound => ApiError::NotFound(err.message),
            ErrorCode::Internal => ApiError::Internal(err.message),
        }
    }
}

impl From<TriggerError> for ApiError {
    fn from(err: TriggerError) -> Self {
        match err {
            TriggerError::Store(StoreError::InvalidPath(path)) => {
                ApiError::InvalidArgument(format!("Invalid conversation id: {path}"))
            }
            TriggerError::MissingParam(name) => {
                ApiError::InvalidArgument(format!("Missing path parameter: {name}"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
