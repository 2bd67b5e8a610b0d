//! Employee model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An employee. `card_no` is the unique badge number used to correlate
/// a form's `fromcardno` back to the submitting employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub manager: bool,
    #[serde(rename = "CardNo")]
    pub card_no: i64,
}

impl Employee {
    /// Notification address, if the employee has one on file.
    pub fn notification_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

/// Creation payload for an employee; the datastore assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub department: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub manager: bool,
    #[serde(rename = "CardNo")]
    pub card_no: i64,
}
