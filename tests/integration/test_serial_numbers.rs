//! Serial number assignment tests: gapless sequences through the API,
//! uniqueness under concurrent creation at the storage layer.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::MultipartForm;
use serde_json::{Value, json};
use tempfile::TempDir;
use uuid::Uuid;

use template_approval_api::config::AppConfig;
use template_approval_api::models::{NewEmployee, NewForm};
use template_approval_api::routes::{self, AppState};
use template_approval_api::services::{Mailer, RecordingMailer};
use template_approval_api::storage::{MemoryStorage, StorageBackend};

fn test_config(upload_dir: &std::path::Path) -> AppConfig {
    AppConfig {
        port: 0,
        database_url: None,
        upload_dir: upload_dir.to_path_buf(),
        public_base_url: "http://localhost:5000".to_string(),
        review_url: "http://localhost:3000/templatelist".to_string(),
        smtp: None,
        jwt_secret: "integration-test-secret".to_string(),
        credentials_spec: String::new(),
        seed_file: None,
        mail_timeout: std::time::Duration::from_secs(2),
    }
}

async fn spawn_app() -> (TestServer, AppState, TempDir) {
    let upload_dir = tempfile::tempdir().expect("failed to create temp upload dir");
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let mailer: Arc<dyn Mailer> = Arc::new(RecordingMailer::new());
    let state = AppState::with_parts(test_config(upload_dir.path()), storage, mailer);
    let app = axum::Router::new()
        .nest("/api", routes::create_api_router(&state))
        .with_state(state.clone());
    (
        TestServer::new(app).expect("failed to build test server"),
        state,
        upload_dir,
    )
}

async fn seed_approver(state: &AppState) -> Uuid {
    state
        .storage
        .create_employee(NewEmployee {
            name: "Ravi".to_string(),
            department: "Quality".to_string(),
            email: Some("ravi@example.com".to_string()),
            manager: true,
            card_no: 2001,
        })
        .await
        .unwrap()
        .id
}

fn submission_form(approver_id: Uuid) -> MultipartForm {
    MultipartForm::new()
        .add_text("from", "Asha")
        .add_text("dept", "Quality")
        .add_text("fromcardno", "1042")
        .add_text("for", "Badge template")
        .add_text("purpose", "Replacement")
        .add_text("unit", "Plant 1")
        .add_text("approvalNeededFrom", approver_id.to_string())
}

fn new_form() -> NewForm {
    NewForm {
        from: "Asha".to_string(),
        dept: "Quality".to_string(),
        fromcardno: "1042".to_string(),
        for_field: "Badge template".to_string(),
        purpose: "Replacement".to_string(),
        unit: "Plant 1".to_string(),
        approval_needed_from: Uuid::new_v4(),
        uploaded_file: None,
        serial_number: None,
    }
}

#[tokio::test]
async fn test_sequential_submissions_get_serials_one_through_n() {
    let (server, state, _upload_dir) = spawn_app().await;
    let approver_id = seed_approver(&state).await;

    for expected in 1..=5 {
        let response = server
            .post("/api/form/submit")
            .multipart(submission_form(approver_id))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(
            response.json::<Value>()["form"]["serialNumber"],
            json!(expected)
        );
    }

    // Search returns them ordered by serial, gapless.
    let response = server.get("/api/forms").await;
    let forms = response.json::<Value>();
    let serials: Vec<i64> = forms
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["serialNumber"].as_i64().unwrap())
        .collect();
    assert_eq!(serials, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_rejected_submissions_do_not_consume_serials() {
    let (server, state, _upload_dir) = spawn_app().await;
    let approver_id = seed_approver(&state).await;

    // Unknown approver: validation fails before any serial is assigned.
    let response = server
        .post("/api/form/submit")
        .multipart(submission_form(Uuid::new_v4()))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/form/submit")
        .multipart(submission_form(approver_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["form"]["serialNumber"], json!(1));
}

#[tokio::test]
async fn test_concurrent_creations_never_duplicate_serials() {
    let storage = Arc::new(MemoryStorage::new());

    let mut handles = Vec::new();
    for _ in 0..10 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            storage.create_form(new_form()).await.unwrap().serial_number
        }));
    }

    let mut serials = HashSet::new();
    for handle in handles {
        assert!(serials.insert(handle.await.unwrap()));
    }
    assert_eq!(serials, (1..=10).collect::<HashSet<i64>>());
}

#[tokio::test]
async fn test_explicit_serial_numbers_pass_through() {
    let storage = MemoryStorage::new();
    let mut request = new_form();
    request.serial_number = Some(100);
    let form = storage.create_form(request).await.unwrap();
    assert_eq!(form.serial_number, 100);
}
