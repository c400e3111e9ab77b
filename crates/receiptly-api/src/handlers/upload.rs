use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use receiptly_core::models::UploadHandle;
use std::sync::Arc;

use crate::error::{ErrorResponse, HttpAppError};
use crate::session::CurrentSession;
use crate::state::AppState;
use crate::utils::upload::extract_multipart_file;

/// Upload a receipt image or PDF
///
/// Accepts exactly one multipart field named `file`. The file is validated,
/// stored, and registered with the caller's session; the returned handle is
/// what every later pipeline step expects back.
///
/// # Errors
/// - `AppError::FileTooLarge` - File exceeds the upload ceiling
/// - `AppError::InvalidFileType` - Content is not an allowed image or PDF
/// - `AppError::BadRequest` - Missing or duplicated `file` field
#[utoipa::path(
    post,
    path = "/upload",
    tag = "receipts",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Receipt stored", body = UploadHandle),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported file type", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session, multipart), fields(operation = "upload_receipt"))]
pub async fn upload_receipt(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadHandle>), HttpAppError> {
    let file = extract_multipart_file(multipart, state.pipeline.max_upload_size_bytes()).await?;
    let handle = state.pipeline.upload(&session.0, file).await?;
    Ok((StatusCode::ACCEPTED, Json(handle)))
}
