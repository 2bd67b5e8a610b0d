//! Authentication context utilities.
//!
//! Request extractor that validates the bearer token and exposes the
//! caller's identity and role as a capability check.

use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};
use tracing::warn;

use super::app_state::AppState;
use super::error::ApiError;
use crate::services::{AuthService, Role};

/// Authentication context extracted from request
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub username: String,
    pub role: Role,
}

impl AuthContext {
    /// Capability check for acting on pending forms.
    pub fn require_approver(&self) -> Result<(), ApiError> {
        if self.role.can_approve() {
            Ok(())
        } else {
            Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "Approver capability required",
            ))
        }
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("No authorization token provided");
                ApiError::new(StatusCode::UNAUTHORIZED, "Authorization required")
            })?;

        let token = AuthService::extract_bearer_token(header).ok_or_else(|| {
            ApiError::new(StatusCode::UNAUTHORIZED, "Authorization required")
        })?;

        let claims = state.auth.validate_token(token).map_err(|e| {
            warn!("Token validation failed: {}", e);
            ApiError::new(StatusCode::UNAUTHORIZED, "Invalid or expired token")
        })?;

        Ok(AuthContext {
            username: claims.sub,
            role: claims.role,
        })
    }
}
