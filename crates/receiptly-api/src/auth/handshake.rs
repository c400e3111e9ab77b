//! OAuth2 authorization-code handshake with the ledger service

use rand::Rng;
use receiptly_core::models::{AuthState, LedgerCredentials};
use receiptly_core::AppError;
use receiptly_services::{LedgerClient, LedgerError};
use receiptly_storage::Storage;
use std::sync::Arc;

use crate::session::{SessionId, SessionStore};

const STATE_BYTES: usize = 16;

/// Drives `Unauthenticated -> AuthorizationPending -> Authenticated` for a
/// session, and back to `Unauthenticated` on logout.
#[derive(Clone)]
pub struct AuthHandshake {
    sessions: SessionStore,
    ledger: Arc<dyn LedgerClient>,
    storage: Arc<dyn Storage>,
    callback_url: String,
    default_group_id: i64,
}

impl AuthHandshake {
    pub fn new(
        sessions: SessionStore,
        ledger: Arc<dyn LedgerClient>,
        storage: Arc<dyn Storage>,
        callback_url: String,
        default_group_id: i64,
    ) -> Self {
        Self {
            sessions,
            ledger,
            storage,
            callback_url,
            default_group_id,
        }
    }

    /// Start authorization and return the identity provider URL.
    pub async fn authorize(&self, session_id: &SessionId) -> String {
        let state = generate_state();
        let url = self.ledger.authorize_url(&self.callback_url, &state);

        self.sessions
            .with_session(session_id, |entry| {
                entry.auth = AuthState::AuthorizationPending { state };
            })
            .await;

        tracing::debug!(callback_url = %self.callback_url, "Authorization started");
        url
    }

    /// Complete authorization with the code returned to the callback.
    ///
    /// Any failure leaves the session `Unauthenticated`.
    pub async fn callback(
        &self,
        session_id: &SessionId,
        code: Option<&str>,
        state: Option<&str>,
    ) -> Result<(), AppError> {
        self.sessions
            .with_session(session_id, |entry| entry.auth.take_pending_state(state))
            .await?;

        let code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AppError::AuthenticationFailed("authorization code missing".to_string())
            })?;

        let access_token = self
            .ledger
            .exchange_code(code, &self.callback_url)
            .await
            .map_err(|e| AppError::AuthenticationFailed(e.to_string()))?;

        let user_id = match self.ledger.current_user(&access_token).await {
            Ok(user) => {
                tracing::info!(ledger_user_id = user.id, "Ledger authorization completed");
                Some(user.id)
            }
            Err(LedgerError::Unauthorized(msg)) => {
                return Err(AppError::AuthenticationFailed(format!(
                    "issued token was rejected: {}",
                    msg
                )));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Authorized, but fetching the ledger user failed");
                None
            }
        };

        let credentials = LedgerCredentials {
            access_token,
            group_id: self.default_group_id,
            user_id,
        };
        self.sessions
            .with_session(session_id, |entry| {
                entry.auth = AuthState::Authenticated(credentials);
            })
            .await;

        Ok(())
    }

    /// Clear the session and delete files nothing is submitting anymore.
    pub async fn logout(&self, session_id: &SessionId) {
        let released = self.sessions.remove(session_id).await;
        for key in &released {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(error = %e, key = %key, "Failed to delete receipt on logout");
            }
        }
        tracing::info!(deleted_files = released.len(), "Session logged out");
    }
}

fn generate_state() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..STATE_BYTES).map(|_| rng.random()).collect();
    hex::encode(bytes)
}
