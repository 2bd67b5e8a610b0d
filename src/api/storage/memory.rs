//! In-memory storage backend.
//!
//! Fallback when no DATABASE_URL is configured, and the backend the
//! test suite runs against. Single mutex over all collections: the
//! serial counter advances under the same lock as the form insert, so
//! assignment is atomic here too.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::traits::{FormFilter, StatusCounts, StorageBackend};
use super::StorageError;
use crate::models::{
    Department, DeliveryState, Employee, Form, FormStatus, NewEmployee, NewForm, NewOutboxEntry,
    OutboxEntry, Unit,
};

#[derive(Default)]
struct Inner {
    forms: Vec<Form>,
    employees: Vec<Employee>,
    departments: Vec<Department>,
    units: Vec<Unit>,
    outbox: Vec<OutboxEntry>,
    serial: i64,
}

/// In-memory storage backend.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn create_form(&self, new_form: NewForm) -> Result<Form, StorageError> {
        let mut inner = self.inner.lock().await;

        let serial_number = match new_form.serial_number {
            Some(n) => n,
            None => {
                inner.serial += 1;
                inner.serial
            }
        };
        if inner.forms.iter().any(|f| f.serial_number == serial_number) {
            return Err(StorageError::Other(format!(
                "Serial number already assigned: {}",
                serial_number
            )));
        }

        let now = Utc::now();
        let form = Form {
            id: Uuid::new_v4(),
            serial_number,
            from: new_form.from,
            dept: new_form.dept,
            fromcardno: new_form.fromcardno,
            for_field: new_form.for_field,
            purpose: new_form.purpose,
            unit: new_form.unit,
            approval_needed_from: new_form.approval_needed_from,
            uploaded_file: new_form.uploaded_file,
            status: FormStatus::Pending,
            modification: String::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        inner.forms.push(form.clone());
        Ok(form)
    }

    async fn get_form(&self, id: Uuid) -> Result<Option<Form>, StorageError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .forms
            .iter()
            .find(|f| f.id == id && !f.deleted)
            .cloned())
    }

    async fn update_form_status(
        &self,
        id: Uuid,
        status: FormStatus,
        modification: Option<String>,
    ) -> Result<Form, StorageError> {
        let mut inner = self.inner.lock().await;
        let form = inner
            .forms
            .iter_mut()
            .find(|f| f.id == id && !f.deleted)
            .ok_or_else(|| StorageError::not_found("form", id))?;

        form.status = status;
        if let Some(modification) = modification {
            form.modification = modification;
        }
        form.updated_at = Utc::now();
        Ok(form.clone())
    }

    async fn soft_delete_form(&self, id: Uuid) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        let form = inner
            .forms
            .iter_mut()
            .find(|f| f.id == id && !f.deleted)
            .ok_or_else(|| StorageError::not_found("form", id))?;
        form.deleted = true;
        form.updated_at = Utc::now();
        Ok(())
    }

    async fn search_forms(&self, filter: &FormFilter) -> Result<Vec<Form>, StorageError> {
        let inner = self.inner.lock().await;
        let mut matches: Vec<Form> = inner
            .forms
            .iter()
            .filter(|f| !f.deleted)
            .filter(|f| {
                filter
                    .serial_number
                    .map(|n| f.serial_number == n)
                    .unwrap_or(true)
            })
            .filter(|f| filter.dept.as_deref().map(|d| f.dept == d).unwrap_or(true))
            .filter(|f| {
                filter
                    .created_from
                    .map(|t| f.created_at >= t)
                    .unwrap_or(true)
            })
            .filter(|f| filter.created_to.map(|t| f.created_at <= t).unwrap_or(true))
            .cloned()
            .collect();
        matches.sort_by_key(|f| f.serial_number);
        Ok(matches)
    }

    async fn forms_by_status(&self, status: &str) -> Result<Vec<Form>, StorageError> {
        let inner = self.inner.lock().await;
        let mut matches: Vec<Form> = inner
            .forms
            .iter()
            .filter(|f| !f.deleted && f.status.as_str() == status)
            .cloned()
            .collect();
        matches.sort_by_key(|f| f.serial_number);
        Ok(matches)
    }

    async fn status_counts(&self) -> Result<StatusCounts, StorageError> {
        let inner = self.inner.lock().await;
        let mut counts = StatusCounts::default();
        for form in inner.forms.iter().filter(|f| !f.deleted) {
            let status = form.status.as_str();
            if status.eq_ignore_ascii_case("approved") {
                counts.approved += 1;
            } else if status.eq_ignore_ascii_case("rejected") {
                counts.rejected += 1;
            } else if status.eq_ignore_ascii_case("modified") {
                counts.modified += 1;
            }
        }
        Ok(counts)
    }

    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.employees.iter().any(|e| e.card_no == employee.card_no) {
            return Err(StorageError::Other(format!(
                "Card number already registered: {}",
                employee.card_no
            )));
        }
        let employee = Employee {
            id: Uuid::new_v4(),
            name: employee.name,
            department: employee.department,
            email: employee.email,
            manager: employee.manager,
            card_no: employee.card_no,
        };
        inner.employees.push(employee.clone());
        Ok(employee)
    }

    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, StorageError> {
        let inner = self.inner.lock().await;
        Ok(inner.employees.iter().find(|e| e.id == id).cloned())
    }

    async fn find_employee_by_card_no(
        &self,
        card_no: i64,
    ) -> Result<Option<Employee>, StorageError> {
        let inner = self.inner.lock().await;
        Ok(inner.employees.iter().find(|e| e.card_no == card_no).cloned())
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, StorageError> {
        let inner = self.inner.lock().await;
        let mut employees = inner.employees.clone();
        employees.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(employees)
    }

    async fn list_approval_authorities(&self) -> Result<Vec<Employee>, StorageError> {
        let inner = self.inner.lock().await;
        let mut managers: Vec<Employee> = inner
            .employees
            .iter()
            .filter(|e| e.manager)
            .cloned()
            .collect();
        managers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(managers)
    }

    async fn create_department(&self, name: String) -> Result<Department, StorageError> {
        let mut inner = self.inner.lock().await;
        let department = Department {
            id: Uuid::new_v4(),
            name,
        };
        inner.departments.push(department.clone());
        Ok(department)
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StorageError> {
        let inner = self.inner.lock().await;
        let mut departments = inner.departments.clone();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn create_unit(&self, unit: String) -> Result<Unit, StorageError> {
        let mut inner = self.inner.lock().await;
        let unit = Unit {
            id: Uuid::new_v4(),
            unit,
        };
        inner.units.push(unit.clone());
        Ok(unit)
    }

    async fn list_units(&self) -> Result<Vec<Unit>, StorageError> {
        let inner = self.inner.lock().await;
        let mut units = inner.units.clone();
        units.sort_by(|a, b| a.unit.cmp(&b.unit));
        Ok(units)
    }

    async fn enqueue_notification(
        &self,
        entry: NewOutboxEntry,
    ) -> Result<OutboxEntry, StorageError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let entry = OutboxEntry {
            id: Uuid::new_v4(),
            form_id: entry.form_id,
            recipient: entry.recipient,
            subject: entry.subject,
            body: entry.body,
            delivery: DeliveryState::Pending,
            error: None,
            created_at: now,
            updated_at: now,
        };
        inner.outbox.push(entry.clone());
        Ok(entry)
    }

    async fn mark_notification(
        &self,
        id: Uuid,
        delivery: DeliveryState,
        error: Option<String>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .outbox
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StorageError::not_found("notification", id))?;
        entry.delivery = delivery;
        entry.error = error;
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn list_notifications_for_form(
        &self,
        form_id: Uuid,
    ) -> Result<Vec<OutboxEntry>, StorageError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .outbox
            .iter()
            .filter(|n| n.form_id == Some(form_id))
            .cloned()
            .collect())
    }
}
