//! API error type with IntoResponse
//!
//! Every handler returns `Result<_, ApiError>`; this is the one place
//! errors become JSON bodies of the form
//! `{"status": "error" | "not-found", "message": ..., "details": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::repos::DbError;
use crate::models::FieldErrors;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Field validation failed (400)
    Validation { message: String, errors: FieldErrors },

    /// Malformed request or duplicate natural key (400)
    BadRequest { message: String, details: String },

    /// Resource not found (404)
    NotFound { message: String, details: String },

    /// Association already recorded (409)
    Conflict { message: String, details: String },

    /// Dependency unreachable (503)
    Unavailable { message: String, details: String },

    /// Store failure (500, logged)
    Store { message: String, source: DbError },
}

impl ApiError {
    /// Map a repository error, attaching the operation-level message.
    pub fn db(e: DbError, message: impl Into<String>) -> Self {
        let message = message.into();
        match e {
            DbError::NotFound { .. } => Self::NotFound {
                message,
                details: e.to_string(),
            },
            DbError::Duplicate { .. } => Self::BadRequest {
                message,
                details: e.to_string(),
            },
            DbError::AlreadyAssociated { .. } => Self::Conflict {
                message,
                details: e.to_string(),
            },
            DbError::Sqlx(_) => Self::Store { message, source: e },
        }
    }

    pub fn validation(errors: FieldErrors, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (kind, message, details) = match self {
            Self::Validation { message, errors } => ("error", message, errors.to_string()),
            Self::BadRequest { message, details }
            | Self::Conflict { message, details }
            | Self::Unavailable { message, details } => ("error", message, details),
            Self::NotFound { message, details } => ("not-found", message, details),
            Self::Store { message, source } => {
                tracing::error!(error = %source, "{}", message);
                let details = match &source {
                    DbError::Sqlx(inner) => inner.to_string(),
                    other => other.to_string(),
                };
                ("error", message, details)
            }
        };

        let body = Json(json!({
            "status": kind,
            "message": message,
            "details": details,
        }));

        (status, body).into_response()
    }
}
