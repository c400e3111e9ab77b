//! Pipeline steps after upload: process, confirm, submit, cancel.
//!
//! Every request echoes the `UploadHandle` returned by `/upload`.

use axum::{extract::State, http::StatusCode, Json};
use receiptly_core::models::{ExpenseResult, PendingSubmission, ReceiptDraft, UploadHandle};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::ExtractedReceipt;
use crate::session::CurrentSession;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct HandleRequest {
    pub handle: UploadHandle,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReceiptRequest {
    pub handle: UploadHandle,
    pub receipt: ReceiptDraft,
}

/// Extract the receipt fields with the vision model
///
/// The result is parked for confirmation and never submitted automatically.
/// Fields the model could not read are listed in `defaulted_fields`.
#[utoipa::path(
    post,
    path = "/receipts/process",
    tag = "receipts",
    request_body = HandleRequest,
    responses(
        (status = 200, description = "Receipt extracted", body = ExtractedReceipt),
        (status = 401, description = "Not authorized with the ledger", body = ErrorResponse),
        (status = 409, description = "Unknown or mismatched handle", body = ErrorResponse),
        (status = 502, description = "Vision model unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, session, request),
    fields(operation = "process_receipt", upload_id = %request.handle.id)
)]
pub async fn process_receipt(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    ValidatedJson(request): ValidatedJson<HandleRequest>,
) -> Result<Json<ExtractedReceipt>, HttpAppError> {
    let extracted = state.pipeline.process(&session.0, &request.handle).await?;
    Ok(Json(extracted))
}

/// Replace the pending receipt with the user's edits
#[utoipa::path(
    post,
    path = "/receipts/confirm",
    tag = "receipts",
    request_body = ReceiptRequest,
    responses(
        (status = 200, description = "Edits accepted", body = PendingSubmission),
        (status = 400, description = "Invalid receipt fields", body = ErrorResponse),
        (status = 401, description = "Not authorized with the ledger", body = ErrorResponse),
        (status = 409, description = "Unknown, mismatched or submitted handle", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, session, request),
    fields(operation = "confirm_receipt", upload_id = %request.handle.id)
)]
pub async fn confirm_receipt(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    ValidatedJson(request): ValidatedJson<ReceiptRequest>,
) -> Result<Json<PendingSubmission>, HttpAppError> {
    let pending = state
        .pipeline
        .confirm(&session.0, &request.handle, &request.receipt)
        .await?;
    Ok(Json(pending))
}

/// Submit the confirmed receipt as one expense split equally over the group
///
/// Each call creates a new expense; nothing is retried automatically.
#[utoipa::path(
    post,
    path = "/receipts/submit",
    tag = "receipts",
    request_body = ReceiptRequest,
    responses(
        (status = 200, description = "Expense created", body = ExpenseResult),
        (status = 400, description = "Invalid receipt fields", body = ErrorResponse),
        (status = 401, description = "Not authorized with the ledger", body = ErrorResponse),
        (status = 409, description = "Unknown or mismatched handle", body = ErrorResponse),
        (status = 502, description = "Ledger rejected or did not answer", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, session, request),
    fields(operation = "submit_receipt", upload_id = %request.handle.id)
)]
pub async fn submit_receipt(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    ValidatedJson(request): ValidatedJson<ReceiptRequest>,
) -> Result<Json<ExpenseResult>, HttpAppError> {
    let result = state
        .pipeline
        .submit(&session.0, &request.handle, &request.receipt)
        .await?;
    Ok(Json(result))
}

/// Discard the upload and its pending receipt
#[utoipa::path(
    post,
    path = "/receipts/cancel",
    tag = "receipts",
    request_body = HandleRequest,
    responses(
        (status = 204, description = "Receipt discarded"),
        (status = 401, description = "Not authorized with the ledger", body = ErrorResponse),
        (status = 409, description = "Unknown handle or submission in flight", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, session, request),
    fields(operation = "cancel_receipt", upload_id = %request.handle.id)
)]
pub async fn cancel_receipt(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    ValidatedJson(request): ValidatedJson<HandleRequest>,
) -> Result<StatusCode, HttpAppError> {
    state.pipeline.cancel(&session.0, &request.handle).await?;
    Ok(StatusCode::NO_CONTENT)
}
