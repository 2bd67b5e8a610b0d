//! Notification dispatcher.
//!
//! Composes the fixed status-change templates plus the submission
//! notice and hands them to a `Mailer`. Every message is recorded in
//! the notification outbox before delivery is attempted, and the
//! delivery outcome is written back afterwards - a mail failure is
//! reported alongside the data it failed to announce, never instead of
//! it. Delivery is one-shot with a bounded timeout; there is no retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{DeliveryState, Employee, Form, FormStatus, NewOutboxEntry};
use crate::storage::{StorageBackend, StorageError};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Failed to compose message: {0}")]
    Compose(String),
    #[error("Mail transport error: {0}")]
    Transport(String),
    #[error("Mail dispatch timed out after {0}s")]
    Timeout(u64),
}

/// Body of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailBody {
    Text(String),
    Html(String),
}

impl EmailBody {
    pub fn as_str(&self) -> &str {
        match self {
            EmailBody::Text(s) | EmailBody::Html(s) => s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: EmailBody,
    pub attachments: Vec<EmailAttachment>,
}

/// Mail transport seam. The SMTP implementation is the production one;
/// the log and recording implementations cover unconfigured
/// environments and tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutboundEmail) -> Result<(), NotificationError>;
}

/// SMTP mailer over lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        username: String,
        password: String,
        from: &str,
    ) -> Result<Self, NotificationError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| NotificationError::Transport(e.to_string()))?
            .credentials(Credentials::new(username, password))
            .build();
        let from = from
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::Compose(e.to_string()))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutboundEmail) -> Result<(), NotificationError> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::Compose(e.to_string()))?;
        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone());

        let body_part = match &mail.body {
            EmailBody::Text(text) => SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone()),
            EmailBody::Html(html) => SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(html.clone()),
        };

        let message = if mail.attachments.is_empty() {
            builder.singlepart(body_part)
        } else {
            let mut parts = MultiPart::mixed().singlepart(body_part);
            for attachment in &mail.attachments {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| NotificationError::Compose(e.to_string()))?;
                parts = parts.singlepart(
                    Attachment::new(attachment.filename.clone())
                        .body(attachment.data.clone(), content_type),
                );
            }
            builder.multipart(parts)
        }
        .map_err(|e| NotificationError::Compose(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| NotificationError::Transport(e.to_string()))
    }
}

/// Mailer used when no SMTP relay is configured: logs the message and
/// reports success.
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutboundEmail) -> Result<(), NotificationError> {
        info!(to = %mail.to, subject = %mail.subject, "SMTP not configured; logging mail instead");
        Ok(())
    }
}

/// Mailer that records every message instead of sending. Used by the
/// test suites to assert on outbound mail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<OutboundEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("recording mailer poisoned").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutboundEmail) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("recording mailer poisoned")
            .push(mail.clone());
        Ok(())
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }
}

/// Fixed template for a status-change notice. Pending has none.
pub fn status_notice(status: FormStatus, modification: &str) -> Option<(String, String)> {
    match status {
        FormStatus::Pending => None,
        FormStatus::Approved => Some((
            "Form Approval".to_string(),
            "Your form has been approved".to_string(),
        )),
        FormStatus::Rejected => Some((
            "Form Rejection".to_string(),
            "Your form has been rejected".to_string(),
        )),
        FormStatus::Modified => Some((
            "Form Modification Needed".to_string(),
            format!("Your form need some modifications:- {}", modification),
        )),
    }
}

/// Submission notice sent to the approver: review link plus every
/// submitted field.
pub fn submission_notice(form: &Form, review_url: &str) -> (String, String) {
    let body = format!(
        "<p>Kindly check and approve the below template via the link:</p>\n\
         <p><a href=\"{url}\" target=\"_blank\">{url}</a></p>\n\
         <p><strong>From:</strong> {from}</p>\n\
         <p><strong>Department:</strong> {dept}</p>\n\
         <p><strong>For:</strong> {for_field}</p>\n\
         <p><strong>Purpose:</strong> {purpose}</p>\n\
         <p><strong>Unit:</strong> {unit}</p>\n\
         <p><strong>From Card No:</strong> {fromcardno}</p>",
        url = review_url,
        from = html_escape(&form.from),
        dept = html_escape(&form.dept),
        for_field = html_escape(&form.for_field),
        purpose = html_escape(&form.purpose),
        unit = html_escape(&form.unit),
        fromcardno = html_escape(&form.fromcardno),
    );
    ("Template Approval".to_string(), body)
}

fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Notification dispatcher: outbox bookkeeping around a one-shot,
/// timeout-bounded delivery attempt.
pub struct NotificationService {
    storage: Arc<dyn StorageBackend>,
    mailer: Arc<dyn Mailer>,
    review_url: String,
    send_timeout: Duration,
}

impl NotificationService {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        mailer: Arc<dyn Mailer>,
        review_url: String,
        send_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            mailer,
            review_url,
            send_timeout,
        }
    }

    /// Send the status-change notice to the submitting employee.
    /// Returns None when the status carries no template (Pending).
    pub async fn notify_status_change(
        &self,
        form: &Form,
        employee: &Employee,
        modification: &str,
    ) -> Result<Option<DeliveryOutcome>, StorageError> {
        let Some((subject, body)) = status_notice(form.status, modification) else {
            return Ok(None);
        };

        let Some(recipient) = employee.notification_email() else {
            warn!(employee = %employee.name, form_id = %form.id, "Employee has no email address on file");
            return Ok(Some(DeliveryOutcome::Failed(
                "employee has no email address on file".to_string(),
            )));
        };

        let entry = self
            .storage
            .enqueue_notification(NewOutboxEntry {
                form_id: Some(form.id),
                recipient: recipient.to_string(),
                subject: subject.clone(),
                body: body.clone(),
            })
            .await?;

        let mail = OutboundEmail {
            to: recipient.to_string(),
            subject,
            body: EmailBody::Text(body),
            attachments: Vec::new(),
        };
        Ok(Some(self.deliver(entry.id, &mail).await))
    }

    /// Send the submission notice to the approver, attaching the
    /// uploaded file when present.
    pub async fn send_submission_notice(
        &self,
        form: &Form,
        approver: &Employee,
        attachment: Option<EmailAttachment>,
    ) -> Result<DeliveryOutcome, StorageError> {
        let Some(recipient) = approver.notification_email() else {
            warn!(approver = %approver.name, form_id = %form.id, "Approver has no email address on file");
            return Ok(DeliveryOutcome::Failed(
                "approver has no email address on file".to_string(),
            ));
        };

        let (subject, body) = submission_notice(form, &self.review_url);
        let entry = self
            .storage
            .enqueue_notification(NewOutboxEntry {
                form_id: Some(form.id),
                recipient: recipient.to_string(),
                subject: subject.clone(),
                body: body.clone(),
            })
            .await?;

        let mail = OutboundEmail {
            to: recipient.to_string(),
            subject,
            body: EmailBody::Html(body),
            attachments: attachment.into_iter().collect(),
        };
        Ok(self.deliver(entry.id, &mail).await)
    }

    /// Ad-hoc outbound email with optional attachments.
    pub async fn send_adhoc(
        &self,
        to: String,
        subject: String,
        body: String,
        attachments: Vec<EmailAttachment>,
    ) -> Result<DeliveryOutcome, StorageError> {
        let entry = self
            .storage
            .enqueue_notification(NewOutboxEntry {
                form_id: None,
                recipient: to.clone(),
                subject: subject.clone(),
                body: body.clone(),
            })
            .await?;

        let mail = OutboundEmail {
            to,
            subject,
            body: EmailBody::Text(body),
            attachments,
        };
        Ok(self.deliver(entry.id, &mail).await)
    }

    async fn deliver(&self, outbox_id: Uuid, mail: &OutboundEmail) -> DeliveryOutcome {
        let outcome =
            match tokio::time::timeout(self.send_timeout, self.mailer.send(mail)).await {
                Ok(Ok(())) => DeliveryOutcome::Sent,
                Ok(Err(e)) => DeliveryOutcome::Failed(e.to_string()),
                Err(_) => DeliveryOutcome::Failed(
                    NotificationError::Timeout(self.send_timeout.as_secs()).to_string(),
                ),
            };

        let (state, error) = match &outcome {
            DeliveryOutcome::Sent => (DeliveryState::Sent, None),
            DeliveryOutcome::Failed(reason) => {
                warn!(outbox_id = %outbox_id, to = %mail.to, reason = %reason, "Mail delivery failed");
                (DeliveryState::Failed, Some(reason.clone()))
            }
        };
        if let Err(e) = self.storage.mark_notification(outbox_id, state, error).await {
            warn!(outbox_id = %outbox_id, error = %e, "Failed to record delivery outcome");
        }
        outcome
    }
}
