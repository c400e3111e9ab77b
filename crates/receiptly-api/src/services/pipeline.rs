//! Pipeline controller
//!
//! Sequences upload, extraction, confirmation and submission for one session:
//!
//! 1. `upload` persists the file and registers its handle with the session.
//! 2. `process` extracts a record and parks it as a [`PendingSubmission`].
//! 3. `confirm` replaces the record with a validated user edit.
//! 4. `submit` validates once more and books the expense.
//!
//! Every step after upload must echo the handle it was given; anything not
//! matching the session's own pending record is `StaleSubmission`.

use receiptly_core::models::{
    ExpenseResult, PendingSubmission, ReceiptDraft, SessionStatus, SubmissionStatus, UploadHandle,
};
use receiptly_core::AppError;
use receiptly_storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::{ExtractionService, IngestService, SubmissionService};
use crate::session::{SessionEntry, SessionId, SessionStore, StoredUpload};
use crate::utils::upload::MultipartFile;

/// A freshly extracted receipt awaiting confirmation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExtractedReceipt {
    #[serde(flatten)]
    pub submission: PendingSubmission,
    /// Fields the model did not provide; shown with their defaults.
    pub defaulted_fields: Vec<String>,
}

fn stale(message: &str) -> AppError {
    AppError::StaleSubmission(message.to_string())
}

/// The session's upload for an echoed handle.
fn upload_for<'a>(
    entry: &'a SessionEntry,
    handle: &UploadHandle,
) -> Result<&'a StoredUpload, AppError> {
    let upload = entry
        .uploads
        .get(&handle.id)
        .ok_or_else(|| stale("unknown upload handle; upload the receipt again"))?;
    if &upload.handle != handle {
        return Err(stale("upload handle does not match the stored receipt"));
    }
    Ok(upload)
}

/// The session's pending record for an echoed handle.
fn pending_for<'a>(
    entry: &'a mut SessionEntry,
    handle: &UploadHandle,
) -> Result<&'a mut PendingSubmission, AppError> {
    let pending = entry
        .pending
        .get_mut(&handle.id)
        .ok_or_else(|| stale("no pending receipt for this upload; process it first"))?;
    pending.ensure_handle(handle)?;
    Ok(pending)
}

/// Only records that have not entered submission may be replaced by a
/// fresh extraction.
fn ensure_reprocessable(entry: &SessionEntry, handle: &UploadHandle) -> Result<(), AppError> {
    match entry.pending.get(&handle.id).map(|p| &p.status) {
        Some(SubmissionStatus::Submitting) => Err(AppError::Conflict(
            "receipt is being submitted".to_string(),
        )),
        Some(SubmissionStatus::Submitted { .. }) => Err(stale("receipt was already submitted")),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct PipelineController {
    sessions: SessionStore,
    storage: Arc<dyn Storage>,
    ingest: IngestService,
    extraction: ExtractionService,
    submission: SubmissionService,
    fallback_currency: String,
}

impl PipelineController {
    pub fn new(
        sessions: SessionStore,
        storage: Arc<dyn Storage>,
        ingest: IngestService,
        extraction: ExtractionService,
        submission: SubmissionService,
        fallback_currency: String,
    ) -> Self {
        Self {
            sessions,
            storage,
            ingest,
            extraction,
            submission,
            fallback_currency,
        }
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.ingest.max_upload_size_bytes()
    }

    pub async fn status(&self, session_id: &SessionId) -> SessionStatus {
        self.sessions
            .with_session(session_id, |entry| SessionStatus {
                authenticated: entry.auth.is_authenticated(),
                group_id: entry.auth.credentials().ok().map(|c| c.group_id),
                pending_submissions: entry
                    .pending
                    .values()
                    .filter(|p| !matches!(p.status, SubmissionStatus::Submitted { .. }))
                    .count(),
            })
            .await
    }

    /// Validate, persist and register an upload with the session.
    pub async fn upload(
        &self,
        session_id: &SessionId,
        file: MultipartFile,
    ) -> Result<UploadHandle, AppError> {
        let stored = self
            .ingest
            .ingest(file.data, &file.filename, &file.content_type)
            .await?;
        let handle = stored.handle.clone();

        self.sessions
            .with_session(session_id, |entry| {
                entry.uploads.insert(handle.id, stored);
            })
            .await;

        Ok(handle)
    }

    /// Extract a receipt record and park it for confirmation.
    ///
    /// Never submits. Re-processing replaces an unsubmitted pending record.
    pub async fn process(
        &self,
        session_id: &SessionId,
        handle: &UploadHandle,
    ) -> Result<ExtractedReceipt, AppError> {
        let (credentials, upload) = self
            .sessions
            .with_session(session_id, |entry| -> Result<_, AppError> {
                let credentials = entry.auth.credentials()?.clone();
                let upload = upload_for(entry, handle)?.clone();
                ensure_reprocessable(entry, handle)?;
                Ok((credentials, upload))
            })
            .await?;

        let parsed = match self
            .extraction
            .extract(&upload, &credentials.access_token)
            .await
        {
            Ok(parsed) => parsed,
            Err(AppError::NotAuthenticated) => {
                self.sessions.revoke_credentials(session_id).await;
                return Err(AppError::NotAuthenticated);
            }
            Err(e) => return Err(e),
        };

        let submission = PendingSubmission::new(upload.handle.clone(), parsed.record);
        self.sessions
            .with_existing(session_id, |entry| {
                if !entry.uploads.contains_key(&handle.id) {
                    return Err(stale("upload was discarded during extraction"));
                }
                // A submit may have started or finished while the model was answering.
                ensure_reprocessable(entry, handle)?;
                entry.pending.insert(handle.id, submission.clone());
                Ok(())
            })
            .await
            .unwrap_or_else(|| Err(stale("session ended during extraction")))?;

        Ok(ExtractedReceipt {
            submission,
            defaulted_fields: parsed
                .defaulted_fields
                .into_iter()
                .map(String::from)
                .collect(),
        })
    }

    /// Apply a user edit to the pending record.
    ///
    /// Invalid edits are rejected and leave the pending record untouched.
    pub async fn confirm(
        &self,
        session_id: &SessionId,
        handle: &UploadHandle,
        draft: &ReceiptDraft,
    ) -> Result<PendingSubmission, AppError> {
        self.sessions
            .with_session(session_id, |entry| -> Result<_, AppError> {
                entry.auth.credentials()?;
                let pending = pending_for(entry, handle)?;
                let record = draft.validate(&self.fallback_currency)?;
                pending.apply_edit(record)?;
                Ok(pending.clone())
            })
            .await
    }

    /// Submit the confirmed receipt as one shared expense.
    ///
    /// There is no deduplication: an explicit second submit of the same
    /// record creates a second expense.
    pub async fn submit(
        &self,
        session_id: &SessionId,
        handle: &UploadHandle,
        draft: &ReceiptDraft,
    ) -> Result<ExpenseResult, AppError> {
        let (credentials, upload, record) = self
            .sessions
            .with_session(session_id, |entry| -> Result<_, AppError> {
                let credentials = entry.auth.credentials()?.clone();
                let upload = upload_for(entry, handle)?.clone();
                let pending = pending_for(entry, handle)?;
                let record = draft.validate(&self.fallback_currency)?;
                pending.begin_submission(record.clone())?;
                Ok((credentials, upload, record))
            })
            .await?;

        let outcome = self.submission.submit(&credentials, record, &upload).await;

        self.sessions
            .with_existing(session_id, |entry| {
                if let Some(pending) = entry.pending.get_mut(&handle.id) {
                    match &outcome {
                        Ok(result) => pending.mark_submitted(result.expense_id.clone()),
                        Err(e) => pending.mark_failed(e.to_string()),
                    }
                }
            })
            .await;

        if matches!(outcome, Err(AppError::NotAuthenticated)) {
            self.sessions.revoke_credentials(session_id).await;
        }

        outcome
    }

    /// Discard an upload and its pending record, deleting the file.
    pub async fn cancel(
        &self,
        session_id: &SessionId,
        handle: &UploadHandle,
    ) -> Result<(), AppError> {
        let storage_key = self
            .sessions
            .with_session(session_id, |entry| -> Result<_, AppError> {
                upload_for(entry, handle)?;
                if entry
                    .pending
                    .get(&handle.id)
                    .is_some_and(PendingSubmission::is_in_flight)
                {
                    return Err(AppError::Conflict(
                        "receipt is being submitted and cannot be cancelled".to_string(),
                    ));
                }
                Ok(entry.discard_upload(&handle.id))
            })
            .await?;

        if let Some(key) = storage_key {
            self.storage.delete(&key).await?;
            tracing::info!(upload_id = %handle.id, "Receipt cancelled");
        }
        Ok(())
    }
}
