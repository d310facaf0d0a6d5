//! Error handling for the HTTP layer

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

/// Field name mapped to every message raised against it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Standard error envelope for all HTTP errors
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`
    pub success: bool,
    /// Short error category, e.g. "Validation failed"
    pub error: String,
    pub message: String,
    /// Field-level messages, present for validation failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    pub trace_id: String,
    pub timestamp: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation { errors: FieldErrors, message: String },

    #[error("conflict: {message}")]
    Conflict { error: String, message: String },

    #[error("not found: {message}")]
    NotFound { error: String, message: String },

    #[error("bad request: {message}")]
    BadRequest { error: String, message: String },

    #[error("method {method} not allowed")]
    MethodNotAllowed { method: String },

    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error carrying field-level messages
    pub fn validation(errors: FieldErrors, message: impl Into<String>) -> Self {
        Self::Validation {
            errors,
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            error: "Bad request".to_string(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let trace_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let status = self.status();

        let (error, message, errors) = match self {
            AppError::Validation { errors, message } => {
                ("Validation failed".to_string(), message, Some(errors))
            }
            AppError::Conflict { error, message }
            | AppError::NotFound { error, message }
            | AppError::BadRequest { error, message } => (error, message, None),
            AppError::MethodNotAllowed { method } => (
                "Method not allowed".to_string(),
                format!("Method \"{method}\" not allowed."),
                None,
            ),
            AppError::Timeout => (
                "Request timeout".to_string(),
                "The request took too long to complete.".to_string(),
                None,
            ),
            AppError::Internal(e) => {
                tracing::error!(trace_id = %trace_id, error = ?e, "unhandled internal error");
                // Internal details only leave the process in debug builds
                let message = if cfg!(debug_assertions) {
                    e.to_string()
                } else {
                    "Internal server error".to_string()
                };
                ("Something went wrong!".to_string(), message, None)
            }
        };

        if status.is_server_error() {
            tracing::error!(
                trace_id = %trace_id,
                status_code = %status.as_u16(),
                error = %error,
                "request failed"
            );
        } else {
            tracing::warn!(
                trace_id = %trace_id,
                status_code = %status.as_u16(),
                error = %error,
                message = %message,
                "request rejected"
            );
        }

        let body = ErrorBody {
            success: false,
            error,
            message,
            errors,
            trace_id: trace_id.to_string(),
            timestamp,
        };

        (status, Json(body)).into_response()
    }
}
