//! Form routes: submission, search, counts, status transitions and
//! deletion.

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::ApiError;
use crate::models::FormStatus;
use crate::services::filter_service::attach_file_urls;
use crate::services::{FormSubmission, SearchCriteria, SubmittedAttachment};

/// Query parameters for GET /forms. Empty strings count as absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    serial_number: Option<String>,
    dept: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
}

/// Request body for POST /forms/{id}/status. `data` is accepted as an
/// alias for the modification text.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    status: FormStatus,
    #[serde(default, alias = "data")]
    modification: Option<String>,
}

/// Create the forms router
pub fn forms_router() -> Router<AppState> {
    Router::new()
        .route("/form/submit", post(submit_form))
        .route("/forms", get(search_forms))
        .route("/forms/counts", get(form_counts))
        .route("/forms/status/{status}", get(forms_by_status))
        .route("/forms/{id}/status", post(update_form_status))
        .route("/forms/{id}", delete(delete_form))
}

/// POST /form/submit - create a form from a multipart submission with
/// an optional `file` part, then notify the approver.
async fn submit_form(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut attachment: Option<SubmittedAttachment> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Malformed multipart request: {}", e),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let original_name = field.file_name().unwrap_or("attachment").to_string();
            let content_type = field
                .content_type()
                .map(|ct| ct.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| {
                    ApiError::new(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read attachment: {}", e),
                    )
                })?
                .to_vec();
            if !data.is_empty() {
                attachment = Some(SubmittedAttachment {
                    original_name,
                    content_type,
                    data,
                });
            }
        } else {
            let value = field.text().await.map_err(|e| {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed multipart request: {}", e),
                )
            })?;
            fields.insert(name, value);
        }
    }

    let approval_needed_from = fields
        .get("approvalNeededFrom")
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "Invalid employee selected or email not found",
            )
        })?;

    let submission = FormSubmission {
        from: fields.remove("from").unwrap_or_default(),
        dept: fields.remove("dept").unwrap_or_default(),
        fromcardno: fields.remove("fromcardno").unwrap_or_default(),
        for_field: fields.remove("for").unwrap_or_default(),
        purpose: fields.remove("purpose").unwrap_or_default(),
        unit: fields.remove("unit").unwrap_or_default(),
        approval_needed_from,
        attachment,
    };

    let receipt = state.form_service.submit(submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Form submitted successfully!",
            "form": receipt.form,
            "notification": receipt.notification.as_str(),
        })),
    ))
}

/// GET /forms - filtered search. An empty result is 404, distinct from
/// a server error.
async fn search_forms(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let serial_number = match query.serial_number.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("Invalid serial number: {}", raw),
            )
        })?),
        None => None,
    };

    let forms = state
        .filter_service
        .search(SearchCriteria {
            serial_number,
            dept: query.dept,
            date_from: query.date_from,
            date_to: query.date_to,
        })
        .await?;

    if forms.is_empty() {
        return Err(ApiError::not_found("No forms found"));
    }

    Ok(Json(json!(attach_file_urls(
        &forms,
        &state.config.public_base_url
    ))))
}

/// GET /forms/status/{status} - exact-match status search.
async fn forms_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let forms = state.filter_service.by_status(&status).await?;
    if forms.is_empty() {
        return Err(ApiError::not_found("No forms found."));
    }
    Ok(Json(json!(forms)))
}

/// GET /forms/counts - per-status counts, case-insensitive.
async fn form_counts(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let counts = state.filter_service.counts().await?;
    Ok(Json(json!(counts)))
}

/// POST /forms/{id}/status - transition status and notify the
/// submitting employee. Requires the approver capability.
async fn update_form_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    auth.require_approver()?;

    let change = state
        .form_service
        .update_status(id, request.status, request.modification)
        .await?;

    Ok(Json(json!({
        "message": "Status updated successfully",
        "updatedForm": change.form,
        "notification": change.notification.as_ref().map(|o| o.as_str()),
    })))
}

/// DELETE /forms/{id} - soft-delete. Requires the approver capability.
async fn delete_form(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    auth.require_approver()?;
    state.form_service.delete(id).await?;
    Ok(Json(json!({"message": "Form deleted successfully"})))
}
