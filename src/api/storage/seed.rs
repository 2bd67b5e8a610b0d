//! Reference-data seeding.
//!
//! Departments, units and employees are reference data maintained
//! outside the workflow; on startup they can be loaded from a JSON file
//! (SEED_FILE). Seeding is idempotent: entries that already exist are
//! skipped.

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::{StorageBackend, StorageError};
use crate::models::NewEmployee;

#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub units: Vec<String>,
    #[serde(default)]
    pub employees: Vec<NewEmployee>,
}

pub async fn load_file(path: &Path) -> Result<SeedData, StorageError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StorageError::Other(format!("Failed to read seed file: {}", e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| StorageError::Other(format!("Malformed seed file: {}", e)))
}

pub async fn apply(storage: &dyn StorageBackend, data: SeedData) -> Result<(), StorageError> {
    let existing_departments = storage.list_departments().await?;
    for name in data.departments {
        if !existing_departments.iter().any(|d| d.name == name) {
            storage.create_department(name).await?;
        }
    }

    let existing_units = storage.list_units().await?;
    for unit in data.units {
        if !existing_units.iter().any(|u| u.unit == unit) {
            storage.create_unit(unit).await?;
        }
    }

    let mut seeded = 0usize;
    for employee in data.employees {
        if storage
            .find_employee_by_card_no(employee.card_no)
            .await?
            .is_none()
        {
            storage.create_employee(employee).await?;
            seeded += 1;
        }
    }
    if seeded > 0 {
        info!(seeded, "Seeded employees from seed file");
    }
    Ok(())
}
