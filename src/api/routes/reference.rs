//! Reference-list routes: departments, units, employees and approval
//! authorities.

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::get,
};
use serde_json::{Value, json};

use super::app_state::AppState;
use super::error::ApiError;

/// Create the reference-lists router
pub fn reference_router() -> Router<AppState> {
    Router::new()
        .route("/departments", get(list_departments))
        .route("/units", get(list_units))
        .route("/employees", get(list_employees))
        .route("/employees/{cardno}", get(get_employee_by_card))
        .route("/approval-authorities", get(list_approval_authorities))
}

async fn list_departments(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let departments = state.storage.list_departments().await?;
    Ok(Json(json!(departments)))
}

async fn list_units(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let units = state.storage.list_units().await?;
    Ok(Json(json!(units)))
}

async fn list_employees(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let employees = state.storage.list_employees().await?;
    Ok(Json(json!(employees)))
}

async fn get_employee_by_card(
    State(state): State<AppState>,
    Path(cardno): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let employee = state
        .storage
        .find_employee_by_card_no(cardno)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    Ok(Json(json!(employee)))
}

async fn list_approval_authorities(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let authorities = state.storage.list_approval_authorities().await?;
    Ok(Json(json!(authorities)))
}
