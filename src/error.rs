use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Session expired")]
    SessionExpired,

    #[error("Course is full: {0}")]
    CourseFull(String),

    #[error("Already enrolled in this course")]
    DuplicateEnrollment,

    #[error("Another enrollment action is in progress")]
    ActionInFlight,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Failed to fetch data: {0}")]
    DataFetch(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status = match &self {
            AppError::NotAuthenticated | AppError::SessionExpired | AppError::Auth(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::CourseFull(_) | AppError::DuplicateEnrollment | AppError::ActionInFlight => {
                StatusCode::CONFLICT
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(e) | AppError::DataFetch(e) => {
                error!("backend error: {}", e);
                StatusCode::BAD_GATEWAY
            }
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
