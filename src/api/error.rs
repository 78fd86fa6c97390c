//! Error responses for the HTTP API
//!
//! Every failure leaves the API as a JSON body of the form
//! `{"message": ..., "status": ..., "error_code": ...}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::error::RefError;
use crate::git::repository_manager::RepositoryError;

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: &'static str,
}

impl ApiError {
    pub fn new(
        status_code: StatusCode,
        error_code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            status_code,
            error_code,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE_ENTITY", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            tracing::error!(error_code = self.error_code, "{}", self.message);
        }

        let body = json!({
            "message": self.message,
            "status": self.status_code.as_u16(),
            "error_code": self.error_code,
        });

        (self.status_code, Json(body)).into_response()
    }
}

impl From<RefError> for ApiError {
    fn from(error: RefError) -> Self {
        let message = error.to_string();
        match error {
            RefError::MalformedRefName(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_REF_NAME", message)
            }
            RefError::ReadOnlyNamespace(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "READ_ONLY_NAMESPACE", message)
            }
            RefError::InvalidRefName(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REF_NAME", message)
            }
            RefError::TargetNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "TARGET_NOT_FOUND", message)
            }
            RefError::RefNotFound(_) => Self::new(StatusCode::NOT_FOUND, "REF_NOT_FOUND", message),
            RefError::Denied(_) => {
                Self::new(StatusCode::METHOD_NOT_ALLOWED, "PROTECTED_REF", message)
            }
            RefError::RefConflict(_) => Self::new(StatusCode::CONFLICT, "REF_CONFLICT", message),
            RefError::Backend(_) => Self::internal(message),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(_) | RepositoryError::InvalidPath(_) => {
                Self::new(StatusCode::NOT_FOUND, "REPOSITORY_NOT_FOUND", error.to_string())
            }
            RepositoryError::Io(_) => Self::internal(error.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::unprocessable_entity(rejection.body_text())
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
