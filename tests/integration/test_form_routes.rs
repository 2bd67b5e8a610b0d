//! Integration tests for the form routes, driven through the real
//! router with in-memory storage and a recording mailer.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::{Value, json};
use tempfile::TempDir;

use template_approval_api::config::AppConfig;
use template_approval_api::models::{Employee, FormStatus, NewEmployee};
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
        credentials_spec: "boss:approve-pw:approver,clerk:clerk-pw:submitter".to_string(),
        seed_file: None,
        mail_timeout: std::time::Duration::from_secs(2),
    }
}

struct TestApp {
    server: TestServer,
    state: AppState,
    mailer: Arc<RecordingMailer>,
    upload_dir: TempDir,
}

async fn spawn_app() -> TestApp {
    let upload_dir = tempfile::tempdir().expect("failed to create temp upload dir");
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let mailer = Arc::new(RecordingMailer::new());
    let mailer_dyn: Arc<dyn Mailer> = mailer.clone();
    let state = AppState::with_parts(test_config(upload_dir.path()), storage, mailer_dyn);

    let app = axum::Router::new()
        .nest("/api", routes::create_api_router(&state))
        .with_state(state.clone());

    TestApp {
        server: TestServer::new(app).expect("failed to build test server"),
        state,
        mailer,
        upload_dir,
    }
}

async fn seed_employees(state: &AppState) -> (Employee, Employee) {
    let submitter = state
        .storage
        .create_employee(NewEmployee {
            name: "Asha".to_string(),
            department: "Quality".to_string(),
            email: Some("asha@example.com".to_string()),
            manager: false,
            card_no: 1042,
        })
        .await
        .unwrap();
    let approver = state
        .storage
        .create_employee(NewEmployee {
            name: "Ravi".to_string(),
            department: "Quality".to_string(),
            email: Some("ravi@example.com".to_string()),
            manager: true,
            card_no: 2001,
        })
        .await
        .unwrap();
    (submitter, approver)
}

fn submission_form(approver_id: String) -> MultipartForm {
    MultipartForm::new()
        .add_text("from", "Asha")
        .add_text("dept", "Quality")
        .add_text("fromcardno", "1042")
        .add_text("for", "Badge template")
        .add_text("purpose", "Replacement")
        .add_text("unit", "Plant 1")
        .add_text("approvalNeededFrom", approver_id)
}

async fn login(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({"username": username, "password": password}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json::<Value>()["token"]
        .as_str()
        .expect("login response carries a token")
        .to_string()
}

#[tokio::test]
async fn test_empty_search_is_a_distinct_no_data_response() {
    let app = spawn_app().await;
    let response = app.server.get("/api/forms").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["message"], json!("No forms found"));
}

#[tokio::test]
async fn test_submission_stores_form_and_notifies_approver() {
    let app = spawn_app().await;
    let (_, approver) = seed_employees(&app.state).await;

    let form = submission_form(approver.id.to_string()).add_part(
        "file",
        Part::bytes(b"attachment body".to_vec())
            .file_name("note.txt")
            .mime_type("text/plain"),
    );
    let response = app.server.post("/api/form/submit").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let body = response.json::<Value>();
    assert_eq!(body["message"], json!("Form submitted successfully!"));
    assert_eq!(body["notification"], json!("sent"));
    assert_eq!(body["form"]["serialNumber"], json!(1));
    assert_eq!(body["form"]["status"], json!("Pending"));

    // The attachment landed in the upload directory.
    let stored: Vec<_> = std::fs::read_dir(app.upload_dir.path())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(stored.len(), 1);

    // The approver got the submission notice with every field.
    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ravi@example.com");
    assert_eq!(sent[0].subject, "Template Approval");
    let notice = sent[0].body.as_str();
    assert!(notice.contains("Badge template"));
    assert!(notice.contains("Replacement"));
    assert!(notice.contains("Plant 1"));
    assert!(notice.contains("1042"));
    assert!(notice.contains("http://localhost:3000/templatelist"));
    assert_eq!(sent[0].attachments.len(), 1);
    assert_eq!(sent[0].attachments[0].filename, "note.txt");

    // Search returns the fully-qualified attachment URL.
    let response = app.server.get("/api/forms").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let forms = response.json::<Value>();
    let url = forms[0]["uploadedFile"].as_str().unwrap();
    assert!(url.starts_with("http://localhost:5000/uploads/"));
    assert!(url.ends_with("note.txt"));
}

#[tokio::test]
async fn test_submission_with_unknown_approver_leaves_nothing_behind() {
    let app = spawn_app().await;
    seed_employees(&app.state).await;

    let form = submission_form(uuid::Uuid::new_v4().to_string()).add_part(
        "file",
        Part::bytes(b"orphan".to_vec())
            .file_name("orphan.txt")
            .mime_type("text/plain"),
    );
    let response = app.server.post("/api/form/submit").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["message"],
        json!("Invalid employee selected or email not found")
    );

    // No form record, no stored attachment, no mail.
    assert_eq!(
        app.server.get("/api/forms").await.status_code(),
        StatusCode::NOT_FOUND
    );
    let stored: Vec<_> = std::fs::read_dir(app.upload_dir.path())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(stored.is_empty());
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_submission_requires_an_approver_with_an_email() {
    let app = spawn_app().await;
    let no_email = app
        .state
        .storage
        .create_employee(NewEmployee {
            name: "Silent".to_string(),
            department: "Quality".to_string(),
            email: None,
            manager: true,
            card_no: 3001,
        })
        .await
        .unwrap();

    let response = app
        .server
        .post("/api/form/submit")
        .multipart(submission_form(no_email.id.to_string()))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_filters_combine() {
    let app = spawn_app().await;
    let (_, approver) = seed_employees(&app.state).await;

    app.server
        .post("/api/form/submit")
        .multipart(submission_form(approver.id.to_string()))
        .await
        .assert_status(StatusCode::CREATED);
    let stores_form = MultipartForm::new()
        .add_text("from", "Meena")
        .add_text("dept", "Stores")
        .add_text("fromcardno", "1042")
        .add_text("for", "Stock template")
        .add_text("purpose", "Audit")
        .add_text("unit", "Plant 2")
        .add_text("approvalNeededFrom", approver.id.to_string());
    app.server
        .post("/api/form/submit")
        .multipart(stores_form)
        .await
        .assert_status(StatusCode::CREATED);

    let response = app.server.get("/api/forms?dept=Stores").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let forms = response.json::<Value>();
    assert_eq!(forms.as_array().unwrap().len(), 1);
    assert_eq!(forms[0]["dept"], json!("Stores"));

    let response = app.server.get("/api/forms?serialNumber=1").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()[0]["serialNumber"], json!(1));

    // Mismatched AND combination finds nothing.
    let response = app.server.get("/api/forms?dept=Stores&serialNumber=1").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    // Non-numeric serial number is a client error, not a server error.
    let response = app.server.get("/api/forms?serialNumber=abc").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    // A single-day range covers forms created any time that day.
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d");
    let response = app
        .server
        .get(&format!("/api/forms?dateFrom={today}&dateTo={today}"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_search_is_exact_while_counts_ignore_case() {
    let app = spawn_app().await;
    let (_, approver) = seed_employees(&app.state).await;

    let response = app
        .server
        .post("/api/form/submit")
        .multipart(submission_form(approver.id.to_string()))
        .await;
    let form_id = response.json::<Value>()["form"]["id"]
        .as_str()
        .unwrap()
        .parse::<uuid::Uuid>()
        .unwrap();
    app.state
        .storage
        .update_form_status(form_id, FormStatus::Approved, None)
        .await
        .unwrap();

    let response = app.server.get("/api/forms/status/Approved").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 1);

    // Same word, different case: the exact-match search finds nothing...
    let response = app.server.get("/api/forms/status/approved").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let response = app.server.get("/api/forms/status/APPROVED").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    // ...while the counts endpoint still counts the form.
    let response = app.server.get("/api/forms/counts").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let counts = response.json::<Value>();
    assert_eq!(counts["approved"], json!(1));
    assert_eq!(counts["rejected"], json!(0));
    assert_eq!(counts["modified"], json!(0));
}

#[tokio::test]
async fn test_reference_lists() {
    let app = spawn_app().await;
    let (submitter, _) = seed_employees(&app.state).await;
    app.state
        .storage
        .create_department("Quality".to_string())
        .await
        .unwrap();
    app.state
        .storage
        .create_unit("Plant 1".to_string())
        .await
        .unwrap();

    let response = app.server.get("/api/departments").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 1);

    let response = app.server.get("/api/units").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()[0]["unit"], json!("Plant 1"));

    let response = app.server.get("/api/employees").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 2);

    // Only managers appear as approval authorities.
    let response = app.server.get("/api/approval-authorities").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let authorities = response.json::<Value>();
    assert_eq!(authorities.as_array().unwrap().len(), 1);
    assert_eq!(authorities[0]["name"], json!("Ravi"));

    let response = app
        .server
        .get(&format!("/api/employees/{}", submitter.card_no))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["name"], json!("Asha"));

    let response = app.server.get("/api/employees/9999").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_issues_tokens_and_rejects_bad_credentials() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({"username": "boss", "password": "approve-pw"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["role"], json!("approver"));
    assert!(body["token"].as_str().is_some());

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({"username": "boss", "password": "wrong"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_is_role_gated_and_soft() {
    let app = spawn_app().await;
    let (_, approver) = seed_employees(&app.state).await;

    let response = app
        .server
        .post("/api/form/submit")
        .multipart(submission_form(approver.id.to_string()))
        .await;
    let form_id = response.json::<Value>()["form"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Unauthenticated and non-approver callers are refused.
    let response = app.server.delete(&format!("/api/forms/{}", form_id)).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let clerk_token = login(&app.server, "clerk", "clerk-pw").await;
    let response = app
        .server
        .delete(&format!("/api/forms/{}", form_id))
        .authorization_bearer(&clerk_token)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let boss_token = login(&app.server, "boss", "approve-pw").await;
    let response = app
        .server
        .delete(&format!("/api/forms/{}", form_id))
        .authorization_bearer(&boss_token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // The form is gone from every read path, and a second delete is 404.
    assert_eq!(
        app.server.get("/api/forms").await.status_code(),
        StatusCode::NOT_FOUND
    );
    let response = app
        .server
        .delete(&format!("/api/forms/{}", form_id))
        .authorization_bearer(&boss_token)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_adhoc_email_endpoint() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/send-email")
        .json(&json!({
            "email": "ravi@example.com",
            "subject": "Reminder",
            "body": "Pending approvals are waiting",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>()["message"],
        json!("Email sent successfully")
    );

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ravi@example.com");
    assert_eq!(sent[0].subject, "Reminder");
}
