//! Storage trait definitions for the API storage backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StorageError;

use crate::models::{
    Department, DeliveryState, Employee, Form, FormStatus, NewEmployee, NewForm, NewOutboxEntry,
    OutboxEntry, Unit,
};

/// Search criteria for forms. All provided fields must match (logical
/// AND); absent fields are not constraints. Date bounds are already
/// resolved to instants by the caller (`created_to` carries the
/// end-of-day boundary).
#[derive(Debug, Clone, Default)]
pub struct FormFilter {
    pub serial_number: Option<i64>,
    pub dept: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// Per-status form counts. Counted case-insensitively over the stored
/// status text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub approved: i64,
    pub rejected: i64,
    pub modified: i64,
}

/// Storage backend trait for datastore operations.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Create a form. Assigns id, timestamps and - unless one was
    /// supplied - the next serial number, atomically with the insert.
    async fn create_form(&self, new_form: NewForm) -> Result<Form, StorageError>;

    /// Get a form by id. Soft-deleted forms are not returned.
    async fn get_form(&self, id: Uuid) -> Result<Option<Form>, StorageError>;

    /// Persist a status change (and the modification text when given).
    async fn update_form_status(
        &self,
        id: Uuid,
        status: FormStatus,
        modification: Option<String>,
    ) -> Result<Form, StorageError>;

    /// Flag a form as deleted. The row stays; queries skip it.
    async fn soft_delete_form(&self, id: Uuid) -> Result<(), StorageError>;

    /// Filtered search, ordered by serial number.
    async fn search_forms(&self, filter: &FormFilter) -> Result<Vec<Form>, StorageError>;

    /// Exact-match status search over the stored status text.
    async fn forms_by_status(&self, status: &str) -> Result<Vec<Form>, StorageError>;

    /// Case-insensitive per-status counts.
    async fn status_counts(&self) -> Result<StatusCounts, StorageError>;

    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, StorageError>;

    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, StorageError>;

    async fn find_employee_by_card_no(
        &self,
        card_no: i64,
    ) -> Result<Option<Employee>, StorageError>;

    async fn list_employees(&self) -> Result<Vec<Employee>, StorageError>;

    /// Employees flagged as managers (the approval authorities list).
    async fn list_approval_authorities(&self) -> Result<Vec<Employee>, StorageError>;

    async fn create_department(&self, name: String) -> Result<Department, StorageError>;

    async fn list_departments(&self) -> Result<Vec<Department>, StorageError>;

    async fn create_unit(&self, unit: String) -> Result<Unit, StorageError>;

    async fn list_units(&self) -> Result<Vec<Unit>, StorageError>;

    /// Record a notification before delivery is attempted.
    async fn enqueue_notification(
        &self,
        entry: NewOutboxEntry,
    ) -> Result<OutboxEntry, StorageError>;

    /// Record the delivery outcome of an outbox entry.
    async fn mark_notification(
        &self,
        id: Uuid,
        delivery: DeliveryState,
        error: Option<String>,
    ) -> Result<(), StorageError>;

    /// Outbox entries for a form, oldest first.
    async fn list_notifications_for_form(
        &self,
        form_id: Uuid,
    ) -> Result<Vec<OutboxEntry>, StorageError>;
}
