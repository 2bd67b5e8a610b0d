//! API routes module - organizes all route handlers.

pub mod app_state;
pub mod auth;
pub mod auth_context;
pub mod email;
pub mod error;
pub mod forms;
pub mod reference;

use axum::Router;
pub use app_state::AppState;

/// Create the main API router combining all route modules.
///
/// Note: State is applied by callers (e.g. TestServer); for production
/// use, call `.with_state(app_state)` after mounting.
pub fn create_api_router(app_state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(forms::forms_router())
        .merge(reference::reference_router())
        .merge(email::email_router(app_state.email_rate_limiter.clone()))
        .nest("/auth", auth::auth_router())
}
