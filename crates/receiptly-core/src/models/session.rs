use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;

/// Credentials obtained from the ledger's token exchange.
#[derive(Clone)]
pub struct LedgerCredentials {
    pub access_token: String,
    pub group_id: i64,
    /// Ledger user id, when the ledger reported it at login.
    pub user_id: Option<i64>,
}

impl std::fmt::Debug for LedgerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerCredentials")
            .field("access_token", &"<redacted>")
            .field("group_id", &self.group_id)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Authorization handshake state of one session.
///
/// `Unauthenticated -> AuthorizationPending -> Authenticated -> Unauthenticated`
#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    /// Redirected to the identity provider; `state` must come back on the callback.
    AuthorizationPending { state: String },
    Authenticated(LedgerCredentials),
}

impl AuthState {
    /// Credentials of an authenticated session, or `NotAuthenticated`.
    pub fn credentials(&self) -> Result<&LedgerCredentials, AppError> {
        match self {
            AuthState::Authenticated(credentials) => Ok(credentials),
            _ => Err(AppError::NotAuthenticated),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    /// Accept a callback `state`, returning to `Unauthenticated` on mismatch.
    pub fn take_pending_state(&mut self, returned_state: Option<&str>) -> Result<(), AppError> {
        let previous = std::mem::take(self);
        match (previous, returned_state) {
            (AuthState::AuthorizationPending { state }, Some(returned)) if state == returned => {
                Ok(())
            }
            (AuthState::AuthorizationPending { .. }, _) => Err(AppError::AuthenticationFailed(
                "authorization state mismatch".to_string(),
            )),
            _ => Err(AppError::AuthenticationFailed(
                "no authorization in progress".to_string(),
            )),
        }
    }
}

/// Public view of a session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    pub pending_submissions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_has_no_credentials() {
        let state = AuthState::default();
        assert!(matches!(state.credentials(), Err(AppError::NotAuthenticated)));
        let pending = AuthState::AuthorizationPending {
            state: "abc".to_string(),
        };
        assert!(matches!(pending.credentials(), Err(AppError::NotAuthenticated)));
    }

    #[test]
    fn test_matching_state_is_accepted() {
        let mut state = AuthState::AuthorizationPending {
            state: "abc".to_string(),
        };
        assert!(state.take_pending_state(Some("abc")).is_ok());
        assert!(matches!(state, AuthState::Unauthenticated));
    }

    #[test]
    fn test_mismatched_state_fails_and_resets() {
        let mut state = AuthState::AuthorizationPending {
            state: "abc".to_string(),
        };
        let err = state.take_pending_state(Some("xyz")).unwrap_err();
        assert_eq!(err.error_type(), "AuthenticationFailed");
        assert!(matches!(state, AuthState::Unauthenticated));

        let mut state = AuthState::Unauthenticated;
        assert!(state.take_pending_state(Some("abc")).is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let credentials = LedgerCredentials {
            access_token: "secret-token".to_string(),
            group_id: 7,
            user_id: Some(100),
        };
        assert!(!format!("{:?}", credentials).contains("secret-token"));
    }
}
