use crate::server::error::ApiError;
use crate::server::handlers::{delete_file_handler, server_status_handler, upload_file_handler};
use crate::server::types::AppState;
use crate::utils::constants::{SERVER_REQUEST_BODY_LIMIT, SERVER_REQUEST_TIMEOUT_SECS};
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get, routing::post};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {}", details)).into_response()
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(SERVER_REQUEST_TIMEOUT_SECS),
    );
    // multipart bodies are bounded here rather than by axum's 2 MB default
    let request_body_limit = RequestBodyLimitLayer::new(SERVER_REQUEST_BODY_LIMIT);

    Router::new()
        .route("/", get(server_status_handler))
        .route("/upload", post(upload_file_handler))
        .route("/delete", post(delete_file_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(timeout)
        .layer(cors)
        .layer(request_body_limit)
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(Arc::new(state))
}
