//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::services::ExtractedReceipt;
use receiptly_core::models;

/// Returns the OpenAPI spec served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Receiptly API",
        version = "0.1.0",
        description = "Turns a photographed receipt into one shared expense: upload the receipt, let a vision model read it, confirm or edit the fields, and book it to a Splitwise-compatible ledger split equally over the group. Pipeline steps require an authorized ledger session (cookie `receiptly_session`)."
    ),
    paths(
        handlers::health::health_check,
        // Session and authorization
        handlers::auth::session_status,
        handlers::auth::authorize,
        handlers::auth::callback,
        handlers::auth::logout,
        // Receipts
        handlers::upload::upload_receipt,
        handlers::receipts::process_receipt,
        handlers::receipts::confirm_receipt,
        handlers::receipts::submit_receipt,
        handlers::receipts::cancel_receipt,
        // Catalog
        handlers::catalog::list_categories,
        handlers::catalog::list_groups,
        handlers::catalog::select_group,
    ),
    components(
        schemas(
            // Core models
            models::UploadHandle,
            models::ReceiptRecord,
            models::ReceiptDraft,
            models::PendingSubmission,
            models::SubmissionStatus,
            models::ExpenseResult,
            models::GroupMember,
            models::ParticipantShare,
            models::SessionStatus,
            ExtractedReceipt,
            // Requests
            handlers::receipts::HandleRequest,
            handlers::receipts::ReceiptRequest,
            handlers::catalog::SelectGroupRequest,
            handlers::health::HealthResponse,
            // Ledger catalogue
            receiptly_services::Category,
            receiptly_services::LedgerGroup,
            // Error
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness probe"),
        (name = "auth", description = "Session status and ledger authorization (OAuth2)"),
        (name = "receipts", description = "Upload, extract, confirm, submit and cancel receipts"),
        (name = "catalog", description = "Ledger categories and group selection")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_pipeline_paths() {
        let spec = get_openapi_spec();
        for path in [
            "/upload",
            "/receipts/process",
            "/receipts/confirm",
            "/receipts/submit",
            "/receipts/cancel",
            "/callback",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
