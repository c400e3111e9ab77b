use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::receipt::ReceiptRecord;
use crate::models::upload::UploadHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionStatus {
    AwaitingConfirmation,
    /// A ledger call is in flight.
    Submitting,
    Submitted { expense_id: String },
    Failed { reason: String },
}

/// An extracted receipt waiting for the user to confirm it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingSubmission {
    pub handle: UploadHandle,
    pub receipt: ReceiptRecord,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingSubmission {
    pub fn new(handle: UploadHandle, receipt: ReceiptRecord) -> Self {
        let now = Utc::now();
        PendingSubmission {
            handle,
            receipt,
            status: SubmissionStatus::AwaitingConfirmation,
            created_at: now,
            updated_at: now,
        }
    }

    /// The echoed handle must be the one that produced this record.
    pub fn ensure_handle(&self, echoed: &UploadHandle) -> Result<(), AppError> {
        if &self.handle != echoed {
            return Err(AppError::StaleSubmission(
                "upload handle does not match the pending receipt".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_in_flight(&self) -> bool {
        self.status == SubmissionStatus::Submitting
    }

    /// Replace the record with a validated user edit.
    pub fn apply_edit(&mut self, receipt: ReceiptRecord) -> Result<(), AppError> {
        match self.status {
            SubmissionStatus::Submitting => Err(AppError::Conflict(
                "receipt is being submitted".to_string(),
            )),
            SubmissionStatus::Submitted { .. } => Err(AppError::StaleSubmission(
                "receipt was already submitted and can no longer be edited".to_string(),
            )),
            SubmissionStatus::AwaitingConfirmation | SubmissionStatus::Failed { .. } => {
                self.receipt = receipt;
                self.status = SubmissionStatus::AwaitingConfirmation;
                self.updated_at = Utc::now();
                Ok(())
            }
        }
    }

    /// Mark the record as in flight before the single ledger call.
    ///
    /// A submitted record stays immutable: submitting it again is allowed
    /// only with the identical record and creates another expense.
    pub fn begin_submission(&mut self, receipt: ReceiptRecord) -> Result<(), AppError> {
        match self.status {
            SubmissionStatus::Submitting => {
                return Err(AppError::Conflict(
                    "receipt is already being submitted".to_string(),
                ))
            }
            SubmissionStatus::Submitted { .. } if self.receipt != receipt => {
                return Err(AppError::StaleSubmission(
                    "receipt was already submitted with different values".to_string(),
                ))
            }
            _ => {}
        }
        self.receipt = receipt;
        self.status = SubmissionStatus::Submitting;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_submitted(&mut self, expense_id: String) {
        self.status = SubmissionStatus::Submitted { expense_id };
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, reason: String) {
        self.status = SubmissionStatus::Failed { reason };
        self.updated_at = Utc::now();
    }
}
