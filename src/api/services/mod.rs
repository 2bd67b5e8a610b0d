//! Services module - workflow business logic.

pub mod auth_service;
pub mod filter_service;
pub mod form_service;
pub mod notification_service;

// Re-export for convenience
pub use auth_service::{AuthError, AuthService, Authenticator, Claims, Role, StaticCredentials};
pub use filter_service::{FilterService, SearchCriteria};
pub use form_service::{
    FormService, FormSubmission, StatusChange, SubmissionReceipt, SubmittedAttachment,
    WorkflowError,
};
pub use notification_service::{
    DeliveryOutcome, EmailAttachment, EmailBody, LogMailer, Mailer, NotificationError,
    NotificationService, OutboundEmail, RecordingMailer, SmtpMailer,
};
