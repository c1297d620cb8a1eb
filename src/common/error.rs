// Error handling types for the API

use axum::{
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::fmt;
use tracing::{error, warn};

use super::validation::ValidationResult;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests { message: String, retry_after: u64 },
    InternalServer(String),
    DatabaseError(sqlx::Error),
    ValidationError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::TooManyRequests { message, retry_after } => {
                write!(f, "Too Many Requests: {} (retry after {}s)", message, retry_after)
            }
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::DatabaseError(e)
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalServer(_) | ApiError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let (error_message, code, retry_after) = match self {
            ApiError::Unauthorized(msg) => (msg, "UNAUTHORIZED", None),
            ApiError::Forbidden(msg) => (msg, "FORBIDDEN", None),
            ApiError::BadRequest(msg) => (msg, "BAD_REQUEST", None),
            ApiError::NotFound(msg) => (msg, "NOT_FOUND", None),
            ApiError::Conflict(msg) => (msg, "CONFLICT", None),
            ApiError::TooManyRequests { message, retry_after } => {
                (message, "TOO_MANY_REQUESTS", Some(retry_after))
            }
            ApiError::InternalServer(msg) => {
                error!(error = %msg, "Internal server error");
                (msg, "INTERNAL_SERVER_ERROR", None)
            }
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    "Database operation failed".to_string(),
                    "DATABASE_ERROR",
                    None,
                )
            }
            ApiError::ValidationError(msg) => (msg, "VALIDATION_ERROR", None),
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
            retry_after,
        };

        let mut response = (status, Json(error_response)).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
        }
        response
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            ApiError::ValidationError(error_messages.join(", "))
        }
    }
}

/// Conflict unless a status-guarded write touched a row
///
/// Guarded writes carry the status that was validated in their WHERE clause,
/// so zero rows means someone else changed the record in between.
pub fn ensure_row_changed(rows_affected: u64, what: &str) -> Result<(), ApiError> {
    if rows_affected == 0 {
        warn!(record = %what, "Guarded write lost to a concurrent change");
        return Err(ApiError::Conflict(format!(
            "The {} was changed by someone else; reload and try again",
            what
        )));
    }
    Ok(())
}

/// True when the database rejected a row because of a UNIQUE/PRIMARY KEY clash
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// True when a unique violation involves `column` (given as `table.column`)
///
/// SQLite reports no constraint name, only the offending columns in the
/// message, so this is how a natural-key clash is told apart from an id clash.
pub fn is_unique_violation_on(e: &sqlx::Error, column: &str) -> bool {
    if !is_unique_violation(e) {
        return false;
    }

    match e {
        sqlx::Error::Database(db) => db
            .message()
            .rsplit_once(':')
            .map(|(_, columns)| columns.split(',').any(|c| c.trim() == column))
            .unwrap_or(false),
        _ => false,
    }
}
