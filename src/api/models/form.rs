//! Form model - the central workflow entity (called "template" in the UI).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a form.
///
/// Wire representation uses the exact variant names (`"Pending"`,
/// `"Approved"`, ...); stored values are always canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormStatus {
    Pending,
    Approved,
    Rejected,
    Modified,
}

impl FormStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormStatus::Pending => "Pending",
            FormStatus::Approved => "Approved",
            FormStatus::Rejected => "Rejected",
            FormStatus::Modified => "Modified",
        }
    }

    /// Exact-match parse. Case matters: `"approved"` is not a status.
    pub fn parse_exact(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(FormStatus::Pending),
            "Approved" => Some(FormStatus::Approved),
            "Rejected" => Some(FormStatus::Rejected),
            "Modified" => Some(FormStatus::Modified),
            _ => None,
        }
    }
}

impl std::fmt::Display for FormStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An approval request record.
///
/// Immutable after creation except for `status`, `modification` and the
/// soft-delete flag, all of which change only through the lifecycle
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: Uuid,
    /// Sequential human-facing identifier, unique across all forms.
    pub serial_number: i64,
    pub from: String,
    pub dept: String,
    /// Card number of the submitting employee, kept as free text on the
    /// form and resolved back to an Employee when routing notifications.
    pub fromcardno: String,
    #[serde(rename = "for")]
    pub for_field: String,
    pub purpose: String,
    pub unit: String,
    /// The approver.
    pub approval_needed_from: Uuid,
    /// Stored path of the optional attachment, set at most once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_file: Option<String>,
    pub status: FormStatus,
    /// Modification detail; empty unless the form was sent back Modified
    /// with an explanation.
    #[serde(default)]
    pub modification: String,
    /// Soft-delete flag. Flagged forms are invisible to every query.
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload for a form. The datastore assigns `id`, timestamps
/// and, when `serial_number` is not supplied, the next serial number.
#[derive(Debug, Clone)]
pub struct NewForm {
    pub from: String,
    pub dept: String,
    pub fromcardno: String,
    pub for_field: String,
    pub purpose: String,
    pub unit: String,
    pub approval_needed_from: Uuid,
    pub uploaded_file: Option<String>,
    pub serial_number: Option<i64>,
}
