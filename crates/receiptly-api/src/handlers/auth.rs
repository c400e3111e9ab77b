//! Session status and the OAuth2 handshake endpoints.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use receiptly_core::models::SessionStatus;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::constants::HOME_PATH;
use crate::error::{ErrorResponse, HttpAppError};
use crate::session::CurrentSession;
use crate::state::AppState;

fn see_other(location: &str) -> Result<Response, HttpAppError> {
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, location)
        .body(axum::body::Body::empty())
        .map_err(|e| HttpAppError::from(anyhow::Error::from(e)))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    /// Authorization code issued by the identity provider
    pub code: Option<String>,
    /// State echoed back from the authorize step
    pub state: Option<String>,
}

/// Session status: whether the session is authorized, and for which group.
#[utoipa::path(
    get,
    path = "/",
    tag = "auth",
    responses(
        (status = 200, description = "Current session status", body = SessionStatus)
    )
)]
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    CurrentSession(session_id): CurrentSession,
) -> Json<SessionStatus> {
    Json(state.pipeline.status(&session_id).await)
}

/// Start authorization with the ledger's identity provider.
#[utoipa::path(
    get,
    path = "/authorize",
    tag = "auth",
    responses(
        (status = 303, description = "Redirect to the identity provider")
    )
)]
#[tracing::instrument(skip(state, session), fields(operation = "authorize"))]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
) -> Result<Response, HttpAppError> {
    let url = state.auth.authorize(&session.0).await;
    see_other(&url)
}

/// Complete authorization with the code the identity provider returned.
#[utoipa::path(
    get,
    path = "/callback",
    tag = "auth",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Authorized, redirect to the session status"),
        (status = 401, description = "Authorization failed", body = ErrorResponse),
        (status = 502, description = "Ledger unreachable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session, query), fields(operation = "callback"))]
pub async fn callback(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, HttpAppError> {
    state
        .auth
        .callback(&session.0, query.code.as_deref(), query.state.as_deref())
        .await?;
    see_other(HOME_PATH)
}

/// Clear the session, its uploads and its credentials.
#[utoipa::path(
    get,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 303, description = "Logged out, redirect to the session status")
    )
)]
#[tracing::instrument(skip(state, session), fields(operation = "logout"))]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
) -> Result<impl IntoResponse, HttpAppError> {
    state.auth.logout(&session.0).await;
    see_other(HOME_PATH)
}
