//! Expense submission: one equal-split expense per confirmed receipt

use receiptly_core::models::{ExpenseRequest, ExpenseResult, LedgerCredentials, ReceiptRecord};
use receiptly_core::AppError;
use receiptly_services::{resolve_category_id, LedgerClient, LedgerError};
use receiptly_storage::Storage;
use std::sync::Arc;

use crate::session::StoredUpload;

fn submission_error(err: LedgerError) -> AppError {
    match err {
        LedgerError::Unauthorized(_) => AppError::NotAuthenticated,
        other => AppError::SubmissionFailed(other.to_string()),
    }
}

#[derive(Clone)]
pub struct SubmissionService {
    storage: Arc<dyn Storage>,
    ledger: Arc<dyn LedgerClient>,
}

impl SubmissionService {
    pub fn new(storage: Arc<dyn Storage>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { storage, ledger }
    }

    /// Create the expense, split equally over the group's current members and
    /// paid in full by the signed-in user.
    ///
    /// The ledger is called exactly once and never retried: a retry after an
    /// ambiguous failure could book the expense twice.
    #[tracing::instrument(
        skip(self, credentials, receipt, upload),
        fields(group_id = credentials.group_id, upload_id = %upload.handle.id)
    )]
    pub async fn submit(
        &self,
        credentials: &LedgerCredentials,
        receipt: ReceiptRecord,
        upload: &StoredUpload,
    ) -> Result<ExpenseResult, AppError> {
        let token = credentials.access_token.as_str();

        let members = self
            .ledger
            .group_members(token, credentials.group_id)
            .await
            .map_err(submission_error)?;

        let category_id = match receipt.category.as_deref() {
            Some(name) => self.resolve_category(token, name).await?,
            None => None,
        };

        let paid_by = match credentials.user_id {
            Some(id) => id,
            None => self.ledger.current_user(token).await.map_err(submission_error)?.id,
        };

        let request = ExpenseRequest::equal_split(
            receipt,
            credentials.group_id,
            members,
            category_id,
            paid_by,
        )?;

        let expense_id = self
            .ledger
            .create_expense(token, &request)
            .await
            .map_err(submission_error)?;

        tracing::info!(
            expense_id = %expense_id,
            participants = request.shares.len(),
            "Expense created"
        );

        self.attach_receipt(token, &expense_id, upload).await;

        Ok(ExpenseResult {
            expense_id,
            human_readable_confirmation: request.confirmation_text(),
        })
    }

    /// Unknown categories are dropped rather than failing the submission.
    async fn resolve_category(&self, token: &str, name: &str) -> Result<Option<i64>, AppError> {
        match self.ledger.categories(token).await {
            Ok(categories) => {
                let id = resolve_category_id(&categories, name);
                if id.is_none() {
                    tracing::debug!(category = %name, "Category not found, submitting without it");
                }
                Ok(id)
            }
            Err(LedgerError::Unauthorized(_)) => Err(AppError::NotAuthenticated),
            Err(e) => {
                tracing::warn!(error = %e, "Category list unavailable, submitting without category");
                Ok(None)
            }
        }
    }

    /// Attach the receipt file to the created expense. Best effort: the
    /// expense already exists, so a failure here is only logged.
    async fn attach_receipt(&self, token: &str, expense_id: &str, upload: &StoredUpload) {
        let data = match self.storage.download(&upload.storage_key).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, expense_id = %expense_id, "Receipt file unavailable for attachment");
                return;
            }
        };

        if let Err(e) = self
            .ledger
            .attach_receipt(
                token,
                expense_id,
                &upload.handle.original_filename,
                &upload.handle.mime_type,
                data,
            )
            .await
        {
            tracing::warn!(error = %e, expense_id = %expense_id, "Failed to attach receipt to expense");
        }
    }
}
