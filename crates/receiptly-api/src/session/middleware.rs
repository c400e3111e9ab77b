use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::cookie::{find_session_cookie, generate_session_id};
use super::SessionId;
use crate::state::AppState;

/// Resolve the request's session from its cookie, or start a new one.
///
/// A missing, tampered or foreign cookie yields a fresh unauthenticated
/// session and a `Set-Cookie` header on the response. The store entry itself
/// is created on first use.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(find_session_cookie)
        .and_then(|value| state.session.signer.verify(value));

    let (session_id, is_new) = match existing {
        Some(session_id) => {
            state.session.store.touch(&session_id).await;
            (session_id, false)
        }
        None => (generate_session_id(), true),
    };

    request.extensions_mut().insert::<SessionId>(session_id.clone());
    let mut response = next.run(request).await;

    if is_new {
        match state
            .session
            .signer
            .set_cookie_header(&session_id)
            .and_then(|cookie| HeaderValue::from_str(&cookie).ok())
        {
            Some(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            None => tracing::error!("Failed to build session cookie"),
        }
    }

    response
}
