//! Ledger catalogue: expense categories and group selection.

use axum::{extract::State, Json};
use receiptly_core::models::SessionStatus;
use receiptly_services::{Category, LedgerGroup};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::session::CurrentSession;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectGroupRequest {
    pub group_id: i64,
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = "catalog",
    responses(
        (status = 200, description = "Expense categories, sorted by name", body = Vec<Category>),
        (status = 401, description = "Not authorized with the ledger", body = ErrorResponse),
        (status = 502, description = "Ledger unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(operation = "list_categories"))]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
) -> Result<Json<Vec<Category>>, HttpAppError> {
    let categories = state.catalog.categories(&session.0).await?;
    Ok(Json(categories))
}

#[utoipa::path(
    get,
    path = "/groups",
    tag = "catalog",
    responses(
        (status = 200, description = "The user's groups, smallest first", body = Vec<LedgerGroup>),
        (status = 401, description = "Not authorized with the ledger", body = ErrorResponse),
        (status = 502, description = "Ledger unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(operation = "list_groups"))]
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
) -> Result<Json<Vec<LedgerGroup>>, HttpAppError> {
    let groups = state.catalog.groups(&session.0).await?;
    Ok(Json(groups))
}

/// Switch the group new expenses are booked to
#[utoipa::path(
    post,
    path = "/groups/current",
    tag = "catalog",
    request_body = SelectGroupRequest,
    responses(
        (status = 200, description = "Group selected", body = SessionStatus),
        (status = 400, description = "Not one of the user's groups", body = ErrorResponse),
        (status = 401, description = "Not authorized with the ledger", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, session, request),
    fields(operation = "select_group", group_id = request.group_id)
)]
pub async fn select_group(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    ValidatedJson(request): ValidatedJson<SelectGroupRequest>,
) -> Result<Json<SessionStatus>, HttpAppError> {
    let status = state
        .catalog
        .select_group(&session.0, request.group_id)
        .await?;
    Ok(Json(status))
}
