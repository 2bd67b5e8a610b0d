//! Environment-backed configuration.
//!
//! Every setting has a development default; production deployments set
//! the corresponding environment variables (optionally via `.env`).

use std::path::PathBuf;
use std::time::Duration;

/// SMTP relay settings. Absent entirely when SMTP_HOST is not set, in
/// which case outbound mail is logged instead of sent.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// SQLite database URL; in-memory storage when unset.
    pub database_url: Option<String>,
    pub upload_dir: PathBuf,
    /// Base URL clients can reach this server on; used to build
    /// attachment retrieval URLs.
    pub public_base_url: String,
    /// Review UI link embedded in the submission notice.
    pub review_url: String,
    pub smtp: Option<SmtpConfig>,
    pub jwt_secret: String,
    /// `user:password:role` entries for the credential table.
    pub credentials_spec: String,
    pub seed_file: Option<PathBuf>,
    pub mail_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let smtp = std::env::var("SMTP_HOST").ok().map(|host| {
            let username = std::env::var("EMAIL_USER").unwrap_or_default();
            let password = std::env::var("EMAIL_PASS").unwrap_or_default();
            let from = std::env::var("MAIL_FROM").unwrap_or_else(|_| username.clone());
            SmtpConfig {
                host,
                username,
                password,
                from,
            }
        });

        Self {
            port,
            database_url: std::env::var("DATABASE_URL").ok(),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            review_url: std::env::var("REVIEW_URL")
                .unwrap_or_else(|_| "http://localhost:3000/templatelist".to_string()),
            smtp,
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-do-not-use-in-production".to_string()),
            credentials_spec: std::env::var("APP_CREDENTIALS").unwrap_or_default(),
            seed_file: std::env::var("SEED_FILE").ok().map(PathBuf::from),
            mail_timeout: Duration::from_secs(
                std::env::var("MAIL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}
