use crate::core::recompress::RecompressError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub const ACCESS_FORBIDDEN_MESSAGE: &str = "Access forbidden!";
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Access forbidden!")]
    AccessDenied,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    ImageProcessing(#[from] RecompressError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(format!("I/O error: {err}"))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::AccessDenied => (StatusCode::FORBIDDEN, ACCESS_FORBIDDEN_MESSAGE.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ImageProcessing(err) => {
                tracing::error!(details = %err, "Image processing failed");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Internal(details) => {
                // full detail stays in the log, the client gets a generic message
                tracing::error!(details = %details, "Unexpected error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
