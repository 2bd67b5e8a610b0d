//! Unit tests for the filter service.

use std::sync::Arc;

use chrono::{Days, Utc};
use uuid::Uuid;

use template_approval_api::models::{FormStatus, NewForm};
use template_approval_api::services::filter_service::attach_file_urls;
use template_approval_api::services::{FilterService, SearchCriteria, WorkflowError};
use template_approval_api::storage::{MemoryStorage, StorageBackend};

fn new_form(dept: &str) -> NewForm {
    NewForm {
        from: "Asha".to_string(),
        dept: dept.to_string(),
        fromcardno: "1042".to_string(),
        for_field: "Badge template".to_string(),
        purpose: "Replacement".to_string(),
        unit: "Plant 1".to_string(),
        approval_needed_from: Uuid::new_v4(),
        uploaded_file: None,
        serial_number: None,
    }
}

fn service_over(storage: Arc<MemoryStorage>) -> FilterService {
    FilterService::new(storage)
}

#[tokio::test]
async fn test_no_criteria_returns_everything() {
    let storage = Arc::new(MemoryStorage::new());
    storage.create_form(new_form("Quality")).await.unwrap();
    storage.create_form(new_form("Stores")).await.unwrap();

    let service = service_over(storage);
    let forms = service.search(SearchCriteria::default()).await.unwrap();
    assert_eq!(forms.len(), 2);
    // Ordered by serial number.
    assert_eq!(forms[0].serial_number, 1);
    assert_eq!(forms[1].serial_number, 2);
}

#[tokio::test]
async fn test_empty_strings_are_not_constraints() {
    let storage = Arc::new(MemoryStorage::new());
    storage.create_form(new_form("Quality")).await.unwrap();

    let service = service_over(storage);
    let forms = service
        .search(SearchCriteria {
            serial_number: None,
            dept: Some(String::new()),
            date_from: Some(String::new()),
            date_to: Some(String::new()),
        })
        .await
        .unwrap();
    assert_eq!(forms.len(), 1);
}

#[tokio::test]
async fn test_single_day_range_is_inclusive_of_the_whole_day() {
    let storage = Arc::new(MemoryStorage::new());
    storage.create_form(new_form("Quality")).await.unwrap();

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let service = service_over(storage);
    let forms = service
        .search(SearchCriteria {
            date_from: Some(today.clone()),
            date_to: Some(today),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(forms.len(), 1);
}

#[tokio::test]
async fn test_date_upper_bound_excludes_later_forms() {
    let storage = Arc::new(MemoryStorage::new());
    storage.create_form(new_form("Quality")).await.unwrap();

    let yesterday = (Utc::now().date_naive() - Days::new(1))
        .format("%Y-%m-%d")
        .to_string();
    let service = service_over(storage);
    let forms = service
        .search(SearchCriteria {
            date_to: Some(yesterday),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(forms.is_empty());
}

#[tokio::test]
async fn test_each_date_bound_applies_independently() {
    let storage = Arc::new(MemoryStorage::new());
    storage.create_form(new_form("Quality")).await.unwrap();

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let service = service_over(storage);

    let from_only = service
        .search(SearchCriteria {
            date_from: Some(today.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(from_only.len(), 1);

    let to_only = service
        .search(SearchCriteria {
            date_to: Some(today),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(to_only.len(), 1);
}

#[tokio::test]
async fn test_malformed_date_is_a_validation_error() {
    let storage = Arc::new(MemoryStorage::new());
    let service = service_over(storage);
    let result = service
        .search(SearchCriteria {
            date_from: Some("01-01-2024".to_string()),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
}

#[tokio::test]
async fn test_status_search_exact_while_counts_ignore_case() {
    let storage = Arc::new(MemoryStorage::new());
    let form = storage.create_form(new_form("Quality")).await.unwrap();
    storage
        .update_form_status(form.id, FormStatus::Approved, None)
        .await
        .unwrap();

    let service = service_over(storage);
    assert_eq!(service.by_status("Approved").await.unwrap().len(), 1);
    assert!(service.by_status("approved").await.unwrap().is_empty());

    let counts = service.counts().await.unwrap();
    assert_eq!(counts.approved, 1);
}

#[tokio::test]
async fn test_attach_file_urls_qualifies_stored_paths() {
    let storage = Arc::new(MemoryStorage::new());
    let mut with_file = new_form("Quality");
    with_file.uploaded_file = Some("uploads/99-note.txt".to_string());
    storage.create_form(with_file).await.unwrap();
    storage.create_form(new_form("Quality")).await.unwrap();

    let service = service_over(storage);
    let forms = service.search(SearchCriteria::default()).await.unwrap();
    let values = attach_file_urls(&forms, "http://localhost:5000/");

    assert_eq!(
        values[0]["uploadedFile"],
        serde_json::json!("http://localhost:5000/uploads/99-note.txt")
    );
    assert!(values[1].get("uploadedFile").is_none());
}
