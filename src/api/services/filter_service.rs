//! Filter service for form queries.
//!
//! Translates wire-level search criteria (date strings, optional
//! fields) into storage filters, and augments results with retrieval
//! URLs for stored attachments.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Value, json};

use super::form_service::WorkflowError;
use crate::models::Form;
use crate::storage::{FormFilter, StatusCounts, StorageBackend};

/// Raw search criteria as they arrive on the wire. Dates are
/// `YYYY-MM-DD`; every field is optional and absent fields do not
/// constrain the search.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub serial_number: Option<i64>,
    pub dept: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Read-side service over the form collection.
pub struct FilterService {
    storage: Arc<dyn StorageBackend>,
}

impl FilterService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Filtered search; all provided criteria must match.
    pub async fn search(&self, criteria: SearchCriteria) -> Result<Vec<Form>, WorkflowError> {
        let filter = FormFilter {
            serial_number: criteria.serial_number,
            dept: criteria.dept.filter(|d| !d.is_empty()),
            created_from: criteria
                .date_from
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(start_of_day)
                .transpose()?,
            created_to: criteria
                .date_to
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(end_of_day)
                .transpose()?,
        };
        Ok(self.storage.search_forms(&filter).await?)
    }

    /// Exact-match status search. `"Approved"` matches, `"approved"`
    /// does not; the counts endpoint below is the case-insensitive one.
    pub async fn by_status(&self, status: &str) -> Result<Vec<Form>, WorkflowError> {
        Ok(self.storage.forms_by_status(status).await?)
    }

    /// Case-insensitive per-status counts.
    pub async fn counts(&self) -> Result<StatusCounts, WorkflowError> {
        Ok(self.storage.status_counts().await?)
    }
}

/// Serialize forms for the wire, replacing the stored attachment path
/// with a fully-qualified retrieval URL.
pub fn attach_file_urls(forms: &[Form], base_url: &str) -> Vec<Value> {
    let base = base_url.trim_end_matches('/');
    forms
        .iter()
        .map(|form| {
            let mut value = serde_json::to_value(form).unwrap_or_else(|_| json!({}));
            if let (Some(object), Some(path)) = (value.as_object_mut(), &form.uploaded_file) {
                object.insert(
                    "uploadedFile".to_string(),
                    json!(format!("{}/{}", base, path)),
                );
            }
            value
        })
        .collect()
}

fn parse_date(raw: &str) -> Result<NaiveDate, WorkflowError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| WorkflowError::Validation(format!("Invalid date: {}", raw)))
}

fn start_of_day(raw: &str) -> Result<DateTime<Utc>, WorkflowError> {
    let date = parse_date(raw)?;
    date.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| WorkflowError::Validation(format!("Invalid date: {}", raw)))
}

/// Inclusive end-of-day boundary: the last millisecond of the date.
fn end_of_day(raw: &str) -> Result<DateTime<Utc>, WorkflowError> {
    let date = parse_date(raw)?;
    date.and_hms_milli_opt(23, 59, 59, 999)
        .map(|t| t.and_utc())
        .ok_or_else(|| WorkflowError::Validation(format!("Invalid date: {}", raw)))
}
