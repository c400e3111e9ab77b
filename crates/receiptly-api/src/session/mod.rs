//! Browser sessions
//!
//! Every request outside the health and docs routes runs with a session id,
//! taken from the signed `receiptly_session` cookie or freshly generated.
//! Pipeline state (auth handshake, uploads, pending submissions) lives in
//! [`SessionStore`] under that id, so concurrent users never share state.

pub mod cookie;
pub mod middleware;
pub mod store;

pub use cookie::CookieSigner;
pub use middleware::session_middleware;
pub use store::{SessionEntry, SessionStore, StoredUpload, SweepResult};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use receiptly_core::AppError;

use crate::error::HttpAppError;

/// Opaque session identifier (hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub(crate) String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Session of the current request, installed by [`session_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionId);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| {
                HttpAppError(AppError::Internal(
                    "session middleware is not installed on this route".to_string(),
                ))
            })
    }
}
