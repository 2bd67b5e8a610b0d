//! Form lifecycle service.
//!
//! Owns submission and status transitions: reference validation,
//! transactional writes through the storage backend, then best-effort
//! notification. The status write always commits before delivery is
//! attempted; a mail failure surfaces as a delivery outcome, never as a
//! persistence failure.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::notification_service::{DeliveryOutcome, EmailAttachment, NotificationService};
use crate::models::{Form, FormStatus, NewForm};
use crate::storage::{StorageBackend, StorageError, UploadStore};

/// Workflow-level errors, kept typed internally even though the wire
/// format stays coarse.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    #[error("Missing or invalid field: {0}")]
    Validation(String),
    #[error(transparent)]
    Persistence(#[from] StorageError),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str) -> Self {
        WorkflowError::NotFound { entity }
    }
}

/// An uploaded attachment as received from the client.
#[derive(Debug, Clone)]
pub struct SubmittedAttachment {
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A submission request: the required form fields plus the optional
/// attachment.
#[derive(Debug, Clone)]
pub struct FormSubmission {
    pub from: String,
    pub dept: String,
    pub fromcardno: String,
    pub for_field: String,
    pub purpose: String,
    pub unit: String,
    pub approval_needed_from: Uuid,
    pub attachment: Option<SubmittedAttachment>,
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub form: Form,
    pub notification: DeliveryOutcome,
}

/// Result of a successful status transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub form: Form,
    pub notification: Option<DeliveryOutcome>,
}

/// Form lifecycle manager.
pub struct FormService {
    storage: Arc<dyn StorageBackend>,
    notifier: Arc<NotificationService>,
    uploads: Arc<UploadStore>,
}

impl FormService {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        notifier: Arc<NotificationService>,
        uploads: Arc<UploadStore>,
    ) -> Self {
        Self {
            storage,
            notifier,
            uploads,
        }
    }

    /// Create a form and notify the approver.
    ///
    /// The approver reference is validated before the attachment is
    /// persisted, so a rejected submission leaves nothing behind.
    pub async fn submit(
        &self,
        submission: FormSubmission,
    ) -> Result<SubmissionReceipt, WorkflowError> {
        for (field, value) in [
            ("from", &submission.from),
            ("dept", &submission.dept),
            ("fromcardno", &submission.fromcardno),
            ("for", &submission.for_field),
            ("purpose", &submission.purpose),
            ("unit", &submission.unit),
        ] {
            if value.trim().is_empty() {
                return Err(WorkflowError::Validation(field.to_string()));
            }
        }

        let approver = self
            .storage
            .get_employee(submission.approval_needed_from)
            .await?
            .ok_or_else(|| {
                WorkflowError::InvalidReference(
                    "Invalid employee selected or email not found".to_string(),
                )
            })?;
        if approver.notification_email().is_none() {
            return Err(WorkflowError::InvalidReference(
                "Invalid employee selected or email not found".to_string(),
            ));
        }

        let uploaded_file = match &submission.attachment {
            Some(attachment) => Some(
                self.uploads
                    .save(&attachment.original_name, &attachment.data)
                    .await?,
            ),
            None => None,
        };

        let form = self
            .storage
            .create_form(NewForm {
                from: submission.from,
                dept: submission.dept,
                fromcardno: submission.fromcardno,
                for_field: submission.for_field,
                purpose: submission.purpose,
                unit: submission.unit,
                approval_needed_from: submission.approval_needed_from,
                uploaded_file,
                serial_number: None,
            })
            .await?;

        info!(form_id = %form.id, serial_number = form.serial_number, "Form submitted");

        let attachment = submission.attachment.map(|a| EmailAttachment {
            filename: a.original_name,
            content_type: a.content_type,
            data: a.data,
        });
        let notification = self
            .notifier
            .send_submission_notice(&form, &approver, attachment)
            .await?;

        Ok(SubmissionReceipt { form, notification })
    }

    /// Transition a form's status and notify the submitting employee.
    pub async fn update_status(
        &self,
        form_id: Uuid,
        new_status: FormStatus,
        modification: Option<String>,
    ) -> Result<StatusChange, WorkflowError> {
        let form = self
            .storage
            .get_form(form_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Form"))?;

        // The notification target must resolve before anything is written.
        let card_no: i64 = form.fromcardno.trim().parse().map_err(|_| {
            WorkflowError::InvalidReference(format!(
                "Card number does not resolve to an employee: {}",
                form.fromcardno
            ))
        })?;
        let employee = self
            .storage
            .find_employee_by_card_no(card_no)
            .await?
            .ok_or_else(|| {
                WorkflowError::InvalidReference(format!(
                    "Card number does not resolve to an employee: {}",
                    card_no
                ))
            })?;

        let modification_text = modification.unwrap_or_default();
        let persisted_modification = if new_status == FormStatus::Modified
            && !modification_text.is_empty()
        {
            Some(modification_text.clone())
        } else {
            None
        };

        let updated = match self
            .storage
            .update_form_status(form_id, new_status, persisted_modification)
            .await
        {
            Ok(form) => form,
            Err(StorageError::NotFound { .. }) => {
                return Err(WorkflowError::not_found("Form"));
            }
            Err(e) => return Err(e.into()),
        };

        info!(form_id = %form_id, status = %new_status, "Form status updated");

        let notification = self
            .notifier
            .notify_status_change(&updated, &employee, &modification_text)
            .await?;

        Ok(StatusChange {
            form: updated,
            notification,
        })
    }

    /// Soft-delete a form.
    pub async fn delete(&self, form_id: Uuid) -> Result<(), WorkflowError> {
        match self.storage.soft_delete_form(form_id).await {
            Ok(()) => {
                info!(form_id = %form_id, "Form deleted");
                Ok(())
            }
            Err(StorageError::NotFound { .. }) => Err(WorkflowError::not_found("Form")),
            Err(e) => Err(e.into()),
        }
    }
}
