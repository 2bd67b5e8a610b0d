//! Application state management.
//!
//! Defines the AppState struct that holds all shared application state:
//! storage backend, workflow services, mailer, authentication and the
//! ad-hoc email rate limiter.

use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::middleware::rate_limit::{RateLimiterState, create_rate_limiter};
use crate::services::{
    AuthService, Authenticator, FilterService, FormService, LogMailer, Mailer,
    NotificationService, SmtpMailer, StaticCredentials,
};
use crate::storage::{MemoryStorage, SqliteStorage, StorageBackend, UploadStore, seed};

/// Application state shared across all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Datastore behind the storage trait (SQLite or in-memory)
    pub storage: Arc<dyn StorageBackend>,
    /// Form lifecycle service (submission, status transitions, deletion)
    pub form_service: Arc<FormService>,
    /// Read-side query service
    pub filter_service: Arc<FilterService>,
    /// Notification dispatcher
    pub notifier: Arc<NotificationService>,
    /// Authentication service (credential validation + tokens)
    pub auth: Arc<AuthService>,
    /// Attachment file store
    pub uploads: Arc<UploadStore>,
    pub config: Arc<AppConfig>,
    /// Rate limiter for the ad-hoc email endpoint
    pub email_rate_limiter: RateLimiterState,
}

impl AppState {
    /// Assemble the state from explicit parts. Used by `from_config`
    /// and by the test suites, which inject the in-memory backend and a
    /// recording mailer.
    pub fn with_parts(
        config: AppConfig,
        storage: Arc<dyn StorageBackend>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let config = Arc::new(config);
        let uploads = Arc::new(UploadStore::new(config.upload_dir.clone()));
        let notifier = Arc::new(NotificationService::new(
            storage.clone(),
            mailer,
            config.review_url.clone(),
            config.mail_timeout,
        ));
        let form_service = Arc::new(FormService::new(
            storage.clone(),
            notifier.clone(),
            uploads.clone(),
        ));
        let filter_service = Arc::new(FilterService::new(storage.clone()));
        let authenticator: Arc<dyn Authenticator> =
            Arc::new(StaticCredentials::from_spec(&config.credentials_spec));
        let auth = Arc::new(AuthService::new(authenticator, &config.jwt_secret));

        Self {
            storage,
            form_service,
            filter_service,
            notifier,
            auth,
            uploads,
            config,
            email_rate_limiter: create_rate_limiter(),
        }
    }

    /// Initialize state from configuration: SQLite storage when
    /// DATABASE_URL is set (running migrations), in-memory otherwise;
    /// SMTP mailer when a relay is configured, log-only otherwise.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn StorageBackend> = match &config.database_url {
            Some(url) => {
                info!(url = %url, "Using SQLite storage");
                Arc::new(SqliteStorage::connect(url).await?)
            }
            None => {
                info!("DATABASE_URL not set; using in-memory storage");
                Arc::new(MemoryStorage::new())
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(
                &smtp.host,
                smtp.username.clone(),
                smtp.password.clone(),
                &smtp.from,
            )?),
            None => Arc::new(LogMailer),
        };

        let state = Self::with_parts(config, storage, mailer);
        state.uploads.ensure_dir().await?;

        if let Some(seed_path) = &state.config.seed_file {
            let data = seed::load_file(seed_path).await?;
            seed::apply(state.storage.as_ref(), data).await?;
        }

        Ok(state)
    }
}
