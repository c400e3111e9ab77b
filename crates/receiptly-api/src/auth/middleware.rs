use crate::error::HttpAppError;
use crate::session::SessionId;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use receiptly_core::AppError;
use std::sync::Arc;

/// Gate for pipeline routes: the session must hold ledger credentials.
///
/// Rejected requests never reach a handler, so no storage read or external
/// call happens for them.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(session_id) = request.extensions().get::<SessionId>().cloned() else {
        return HttpAppError(AppError::Internal(
            "session middleware must run before the auth gate".to_string(),
        ))
        .into_response();
    };

    let authenticated = state
        .session
        .store
        .with_session(&session_id, |entry| entry.auth.is_authenticated())
        .await;

    if !authenticated {
        tracing::debug!(
            path = %request.uri().path(),
            "Rejected unauthenticated pipeline request"
        );
        return HttpAppError(AppError::NotAuthenticated).into_response();
    }

    next.run(request).await
}
