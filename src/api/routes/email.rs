//! Ad-hoc outbound email route.
//!
//! Attachments are referenced by their stored upload path; arbitrary
//! server paths do not resolve.

use axum::{Router, extract::State, response::Json, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, warn};

use super::app_state::AppState;
use super::error::ApiError;
use crate::middleware::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::services::{DeliveryOutcome, EmailAttachment};

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    email: String,
    subject: String,
    body: String,
    #[serde(default)]
    attachments: Vec<AttachmentRef>,
}

/// Attachment reference: a stored upload path plus the filename to
/// present it under.
#[derive(Debug, Deserialize)]
pub struct AttachmentRef {
    filename: String,
    path: String,
}

/// Create the email router, rate-limited.
pub fn email_router(limiter: RateLimiterState) -> Router<AppState> {
    Router::new()
        .route("/send-email", post(send_email))
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
}

/// POST /send-email
async fn send_email(
    State(state): State<AppState>,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut attachments = Vec::new();
    for reference in &request.attachments {
        let data = state.uploads.read(&reference.path).await.map_err(|e| {
            warn!(path = %reference.path, error = %e, "Unreadable email attachment");
            ApiError::new(
                axum::http::StatusCode::BAD_REQUEST,
                format!("Unreadable attachment: {}", reference.filename),
            )
        })?;
        attachments.push(EmailAttachment {
            filename: reference.filename.clone(),
            content_type: "application/octet-stream".to_string(),
            data,
        });
    }

    let outcome = state
        .notifier
        .send_adhoc(request.email, request.subject, request.body, attachments)
        .await?;

    match outcome {
        DeliveryOutcome::Sent => Ok(Json(json!({"message": "Email sent successfully"}))),
        DeliveryOutcome::Failed(reason) => {
            error!(reason = %reason, "Ad-hoc email failed");
            Err(ApiError::internal("Failed to send email"))
        }
    }
}
