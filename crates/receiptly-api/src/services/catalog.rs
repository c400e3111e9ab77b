//! Ledger catalogue reads: categories and the user's groups

use receiptly_core::models::{AuthState, SessionStatus};
use receiptly_core::AppError;
use receiptly_services::{Category, LedgerClient, LedgerError, LedgerGroup};
use std::sync::Arc;

use crate::session::{SessionId, SessionStore};

#[derive(Clone)]
pub struct CatalogService {
    sessions: SessionStore,
    ledger: Arc<dyn LedgerClient>,
}

impl CatalogService {
    pub fn new(sessions: SessionStore, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { sessions, ledger }
    }

    async fn ledger_error(&self, session_id: &SessionId, err: LedgerError) -> AppError {
        if matches!(err, LedgerError::Unauthorized(_)) {
            self.sessions.revoke_credentials(session_id).await;
        }
        err.into()
    }

    /// Expense categories, sorted by name ignoring case.
    pub async fn categories(&self, session_id: &SessionId) -> Result<Vec<Category>, AppError> {
        let credentials = self.sessions.credentials(session_id).await?;
        let mut categories = match self.ledger.categories(&credentials.access_token).await {
            Ok(categories) => categories,
            Err(e) => return Err(self.ledger_error(session_id, e).await),
        };
        categories.sort_by_key(|c| c.name.to_lowercase());
        Ok(categories)
    }

    /// The user's groups, smallest first.
    pub async fn groups(&self, session_id: &SessionId) -> Result<Vec<LedgerGroup>, AppError> {
        let credentials = self.sessions.credentials(session_id).await?;
        match self.ledger.groups(&credentials.access_token).await {
            Ok(groups) => Ok(groups),
            Err(e) => Err(self.ledger_error(session_id, e).await),
        }
    }

    /// Make `group_id` the session's expense target. The user must belong to it.
    pub async fn select_group(
        &self,
        session_id: &SessionId,
        group_id: i64,
    ) -> Result<SessionStatus, AppError> {
        let groups = self.groups(session_id).await?;
        if !groups.iter().any(|g| g.id == group_id) {
            return Err(AppError::Validation(format!(
                "group {} is not one of your groups",
                group_id
            )));
        }

        self.sessions
            .with_session(session_id, |entry| -> Result<_, AppError> {
                match &mut entry.auth {
                    AuthState::Authenticated(credentials) => {
                        credentials.group_id = group_id;
                        Ok(SessionStatus {
                            authenticated: true,
                            group_id: Some(group_id),
                            pending_submissions: entry.pending.len(),
                        })
                    }
                    _ => Err(AppError::NotAuthenticated),
                }
            })
            .await
    }
}
