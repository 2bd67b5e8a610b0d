//! Authentication routes.
//!
//! Login validates credentials through the injected authenticator and
//! returns a short-lived token carrying the caller's role.

use axum::{Router, extract::State, response::Json, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};

use super::app_state::AppState;
use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

/// Create the auth router
pub fn auth_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let (token, role) = state.auth.login(&request.username, &request.password)?;
    Ok(Json(json!({
        "token": token,
        "role": role,
        "username": request.username,
    })))
}
