//! API error handling utilities.
//!
//! The wire format stays coarse (status code plus a message); the typed
//! cause is logged here before it is flattened.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::services::{AuthError, WorkflowError};
use crate::storage::StorageError;

/// API error response
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "message": self.message,
        });

        (self.status, axum::Json(body)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        match &e {
            WorkflowError::NotFound { entity } => {
                ApiError::not_found(format!("{} not found", entity))
            }
            WorkflowError::InvalidReference(message) => {
                ApiError::new(StatusCode::BAD_REQUEST, message.clone())
            }
            WorkflowError::Validation(detail) => {
                ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid request: {}", detail))
            }
            WorkflowError::Persistence(cause) => {
                error!(error = %cause, "Persistence failure");
                ApiError::internal("Server error")
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match &e {
            StorageError::NotFound { entity_type, .. } => {
                ApiError::not_found(format!("{} not found", entity_type))
            }
            _ => {
                error!(error = %e, "Storage failure");
                ApiError::internal("Server error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match &e {
            AuthError::InvalidCredentials => {
                ApiError::new(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            AuthError::InvalidToken(_) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "Invalid or expired token")
            }
        }
    }
}
