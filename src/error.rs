use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::scheduling::ScheduleError;

/// Failure raised by a storage backend
///
/// Missing rows are not errors: lookups return `Ok(None)` and deletes
/// return `Ok(false)`. What remains is data-store trouble and input the
/// storage layer refuses to persist.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleError),

    /// The newest issue already carries the largest representable number.
    #[error("No issue number left after {0}")]
    IssueNumbersExhausted(i32),
}

/// Error body sent to clients
///
/// ```json
/// { "status": "fail", "message": "Schedule not found" }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Internal HTTP error type returned by handlers
///
/// Bundles the client-facing message with its status code so the two can't
/// drift apart. Axum turns it into a JSON response through `IntoResponse`.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
        }
    }

    /// 500: data-store failures and anything else on our side.
    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 400: validation failures and malformed input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// 404: the addressed record does not exist.
    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError {
            message: message.into(),
            status: StatusCode::NOT_FOUND,
        }
    }

    pub fn into_http_response(self) -> Response {
        let json_response = Json(ErrorResponse {
            status: "fail".to_string(),
            message: self.message.clone(),
        });

        (self.status, json_response).into_response()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

impl From<StorageError> for HttpError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidSchedule(e) => HttpError::bad_request(e.to_string()),
            StorageError::IssueNumbersExhausted(latest) => HttpError::new(
                format!("No issue number left after {}", latest),
                StatusCode::CONFLICT,
            ),
            other => {
                tracing::error!(error = %other, "storage operation failed");
                HttpError::server_error("Server Error. Please try again later")
            }
        }
    }
}
