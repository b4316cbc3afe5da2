use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Test session not found")]
    SessionNotFound,

    #[error("Test session is not active")]
    SessionNotActive,

    #[error("Invalid detection type: {0}")]
    InvalidDetectionType(String),

    #[error("Invalid severity: {0} (expected 1..=5)")]
    InvalidSeverity(i32),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Machine-readable kind carried in the response envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::BadRequest(_) => "bad_request",
            Error::AccessDenied(_) => "access_denied",
            Error::SessionNotFound => "session_not_found",
            Error::SessionNotActive => "session_not_active",
            Error::InvalidDetectionType(_) => "invalid_detection_type",
            Error::InvalidSeverity(_) => "invalid_severity",
            Error::NotFound(_) => "not_found",
            Error::Database(_) => "database",
            Error::Validation(_) => "validation",
            Error::Json(_) => "json",
            Error::Io(_) => "io",
            Error::Multipart(_) => "multipart",
            Error::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) | Error::Validation(_) | Error::Json(_) | Error::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::AccessDenied(_) => StatusCode::FORBIDDEN,
            Error::SessionNotFound | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::SessionNotActive => StatusCode::CONFLICT,
            Error::InvalidDetectionType(_) | Error::InvalidSeverity(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::Config(_) | Error::Database(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            // Do not leak storage details to clients.
            Error::Database(_) => "An internal storage error occurred".to_string(),
            other => other.to_string(),
        };
        let body = Json(json!({
            "success": false,
            "error": self.kind(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
