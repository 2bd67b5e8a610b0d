//! SQLite storage backend implementation.
//!
//! Uses sqlx for database operations and implements the StorageBackend
//! trait. Serial numbers come from the `counters` row, incremented and
//! read inside the same transaction as the form insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use super::traits::{FormFilter, StatusCounts, StorageBackend};
use super::StorageError;
use crate::models::{
    Department, DeliveryState, Employee, Form, FormStatus, NewEmployee, NewForm, NewOutboxEntry,
    OutboxEntry, Unit,
};

/// SQLite storage backend.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Connect, create the database file if missing, and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::ConnectionError(format!("Migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(raw).map_err(|e| StorageError::Other(format!("Malformed uuid {}: {}", raw, e)))
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::Other(format!("Timestamp out of range: {}", ms)))
}

fn form_from_row(row: &SqliteRow) -> Result<Form, StorageError> {
    let id: String = row.try_get("id")?;
    let approval_needed_from: String = row.try_get("approval_needed_from")?;
    let status: String = row.try_get("status")?;
    let status = FormStatus::parse_exact(&status)
        .ok_or_else(|| StorageError::Other(format!("Unknown status value: {}", status)))?;
    let created_at: i64 = row.try_get("created_at")?;
    let updated_at: i64 = row.try_get("updated_at")?;

    Ok(Form {
        id: parse_uuid(&id)?,
        serial_number: row.try_get("serial_number")?,
        from: row.try_get("from")?,
        dept: row.try_get("dept")?,
        fromcardno: row.try_get("fromcardno")?,
        for_field: row.try_get("for")?,
        purpose: row.try_get("purpose")?,
        unit: row.try_get("unit")?,
        approval_needed_from: parse_uuid(&approval_needed_from)?,
        uploaded_file: row.try_get("uploaded_file")?,
        status,
        modification: row.try_get("modification")?,
        deleted: row.try_get("deleted")?,
        created_at: millis_to_datetime(created_at)?,
        updated_at: millis_to_datetime(updated_at)?,
    })
}

fn employee_from_row(row: &SqliteRow) -> Result<Employee, StorageError> {
    let id: String = row.try_get("id")?;
    Ok(Employee {
        id: parse_uuid(&id)?,
        name: row.try_get("name")?,
        department: row.try_get("department")?,
        email: row.try_get("email")?,
        manager: row.try_get("manager")?,
        card_no: row.try_get("card_no")?,
    })
}

fn outbox_from_row(row: &SqliteRow) -> Result<OutboxEntry, StorageError> {
    let id: String = row.try_get("id")?;
    let form_id: Option<String> = row.try_get("form_id")?;
    let delivery: String = row.try_get("delivery")?;
    let delivery = DeliveryState::parse(&delivery)
        .ok_or_else(|| StorageError::Other(format!("Unknown delivery state: {}", delivery)))?;
    let created_at: i64 = row.try_get("created_at")?;
    let updated_at: i64 = row.try_get("updated_at")?;

    Ok(OutboxEntry {
        id: parse_uuid(&id)?,
        form_id: form_id.as_deref().map(parse_uuid).transpose()?,
        recipient: row.try_get("recipient")?,
        subject: row.try_get("subject")?,
        body: row.try_get("body")?,
        delivery,
        error: row.try_get("error")?,
        created_at: millis_to_datetime(created_at)?,
        updated_at: millis_to_datetime(updated_at)?,
    })
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn create_form(&self, new_form: NewForm) -> Result<Form, StorageError> {
        let mut tx = self.pool.begin().await?;

        let serial_number = match new_form.serial_number {
            Some(n) => n,
            None => {
                let row = sqlx::query(
                    "UPDATE counters SET value = value + 1 WHERE name = 'form_serial' RETURNING value",
                )
                .fetch_one(&mut *tx)
                .await?;
                row.try_get::<i64, _>("value")?
            }
        };

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO forms
                (id, serial_number, "from", dept, fromcardno, "for", purpose, unit,
                 approval_needed_from, uploaded_file, status, modification, deleted,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '', 0, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(serial_number)
        .bind(&new_form.from)
        .bind(&new_form.dept)
        .bind(&new_form.fromcardno)
        .bind(&new_form.for_field)
        .bind(&new_form.purpose)
        .bind(&new_form.unit)
        .bind(new_form.approval_needed_from.to_string())
        .bind(&new_form.uploaded_file)
        .bind(FormStatus::Pending.as_str())
        .bind(now.timestamp_millis())
        .bind(now.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Form {
            id,
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
        })
    }

    async fn get_form(&self, id: Uuid) -> Result<Option<Form>, StorageError> {
        let row = sqlx::query("SELECT * FROM forms WHERE id = ? AND deleted = 0")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(form_from_row).transpose()
    }

    async fn update_form_status(
        &self,
        id: Uuid,
        status: FormStatus,
        modification: Option<String>,
    ) -> Result<Form, StorageError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE forms
            SET status = ?, modification = COALESCE(?, modification), updated_at = ?
            WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(status.as_str())
        .bind(&modification)
        .bind(now.timestamp_millis())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("form", id));
        }

        self.get_form(id)
            .await?
            .ok_or_else(|| StorageError::not_found("form", id))
    }

    async fn soft_delete_form(&self, id: Uuid) -> Result<(), StorageError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE forms SET deleted = 1, updated_at = ? WHERE id = ? AND deleted = 0",
        )
        .bind(now.timestamp_millis())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("form", id));
        }
        Ok(())
    }

    async fn search_forms(&self, filter: &FormFilter) -> Result<Vec<Form>, StorageError> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT * FROM forms WHERE deleted = 0",
        );
        if let Some(serial_number) = filter.serial_number {
            qb.push(" AND serial_number = ");
            qb.push_bind(serial_number);
        }
        if let Some(dept) = &filter.dept {
            qb.push(" AND dept = ");
            qb.push_bind(dept.clone());
        }
        if let Some(created_from) = filter.created_from {
            qb.push(" AND created_at >= ");
            qb.push_bind(created_from.timestamp_millis());
        }
        if let Some(created_to) = filter.created_to {
            qb.push(" AND created_at <= ");
            qb.push_bind(created_to.timestamp_millis());
        }
        qb.push(" ORDER BY serial_number");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(form_from_row).collect()
    }

    async fn forms_by_status(&self, status: &str) -> Result<Vec<Form>, StorageError> {
        // BINARY collation: the match is case-sensitive by construction.
        let rows = sqlx::query(
            "SELECT * FROM forms WHERE deleted = 0 AND status = ? ORDER BY serial_number",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(form_from_row).collect()
    }

    async fn status_counts(&self) -> Result<StatusCounts, StorageError> {
        let rows = sqlx::query(
            "SELECT LOWER(status) AS status, COUNT(*) AS n FROM forms WHERE deleted = 0 GROUP BY LOWER(status)",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for row in &rows {
            let status: String = row.try_get("status")?;
            let n: i64 = row.try_get("n")?;
            match status.as_str() {
                "approved" => counts.approved = n,
                "rejected" => counts.rejected = n,
                "modified" => counts.modified = n,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, StorageError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO employees (id, name, department, email, manager, card_no) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&employee.name)
        .bind(&employee.department)
        .bind(&employee.email)
        .bind(employee.manager)
        .bind(employee.card_no)
        .execute(&self.pool)
        .await?;

        Ok(Employee {
            id,
            name: employee.name,
            department: employee.department,
            email: employee.email,
            manager: employee.manager,
            card_no: employee.card_no,
        })
    }

    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, StorageError> {
        let row = sqlx::query("SELECT * FROM employees WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(employee_from_row).transpose()
    }

    async fn find_employee_by_card_no(
        &self,
        card_no: i64,
    ) -> Result<Option<Employee>, StorageError> {
        let row = sqlx::query("SELECT * FROM employees WHERE card_no = ?")
            .bind(card_no)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(employee_from_row).transpose()
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, StorageError> {
        let rows = sqlx::query("SELECT * FROM employees ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(employee_from_row).collect()
    }

    async fn list_approval_authorities(&self) -> Result<Vec<Employee>, StorageError> {
        let rows = sqlx::query("SELECT * FROM employees WHERE manager = 1 ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(employee_from_row).collect()
    }

    async fn create_department(&self, name: String) -> Result<Department, StorageError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO departments (id, name) VALUES (?, ?)")
            .bind(id.to_string())
            .bind(&name)
            .execute(&self.pool)
            .await?;
        Ok(Department { id, name })
    }

    async fn list_departments(&self) -> Result<Vec<Department>, StorageError> {
        let rows = sqlx::query("SELECT * FROM departments ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                Ok(Department {
                    id: parse_uuid(&id)?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn create_unit(&self, unit: String) -> Result<Unit, StorageError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO units (id, unit) VALUES (?, ?)")
            .bind(id.to_string())
            .bind(&unit)
            .execute(&self.pool)
            .await?;
        Ok(Unit { id, unit })
    }

    async fn list_units(&self) -> Result<Vec<Unit>, StorageError> {
        let rows = sqlx::query("SELECT * FROM units ORDER BY unit")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                Ok(Unit {
                    id: parse_uuid(&id)?,
                    unit: row.try_get("unit")?,
                })
            })
            .collect()
    }

    async fn enqueue_notification(
        &self,
        entry: NewOutboxEntry,
    ) -> Result<OutboxEntry, StorageError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO notification_outbox
                (id, form_id, recipient, subject, body, delivery, error, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'pending', NULL, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(entry.form_id.map(|f| f.to_string()))
        .bind(&entry.recipient)
        .bind(&entry.subject)
        .bind(&entry.body)
        .bind(now.timestamp_millis())
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(OutboxEntry {
            id,
            form_id: entry.form_id,
            recipient: entry.recipient,
            subject: entry.subject,
            body: entry.body,
            delivery: DeliveryState::Pending,
            error: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn mark_notification(
        &self,
        id: Uuid,
        delivery: DeliveryState,
        error: Option<String>,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE notification_outbox SET delivery = ?, error = ?, updated_at = ? WHERE id = ?",
        )
        .bind(delivery.as_str())
        .bind(&error)
        .bind(now.timestamp_millis())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("notification", id));
        }
        Ok(())
    }

    async fn list_notifications_for_form(
        &self,
        form_id: Uuid,
    ) -> Result<Vec<OutboxEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM notification_outbox WHERE form_id = ? ORDER BY created_at",
        )
        .bind(form_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(outbox_from_row).collect()
    }
}
