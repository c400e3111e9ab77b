use chrono::{DateTime, Duration, Utc};
use receiptly_core::models::{AuthState, LedgerCredentials, PendingSubmission, UploadHandle};
use receiptly_core::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::SessionId;

/// A persisted upload owned by one session.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub handle: UploadHandle,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the pipeline knows about one browser session.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub auth: AuthState,
    pub uploads: HashMap<Uuid, StoredUpload>,
    pub pending: HashMap<Uuid, PendingSubmission>,
    pub last_seen: DateTime<Utc>,
}

impl Default for SessionEntry {
    fn default() -> Self {
        Self {
            auth: AuthState::default(),
            uploads: HashMap::new(),
            pending: HashMap::new(),
            last_seen: Utc::now(),
        }
    }
}

impl SessionEntry {
    fn is_in_flight(&self, upload_id: &Uuid) -> bool {
        self.pending
            .get(upload_id)
            .is_some_and(PendingSubmission::is_in_flight)
    }

    /// Drop an upload and its pending record, returning the storage key.
    pub fn discard_upload(&mut self, upload_id: &Uuid) -> Option<String> {
        self.pending.remove(upload_id);
        self.uploads.remove(upload_id).map(|u| u.storage_key)
    }

    /// Storage keys that may be deleted when this session goes away.
    fn releasable_keys(&self) -> Vec<String> {
        self.uploads
            .iter()
            .filter(|(id, _)| !self.is_in_flight(id))
            .map(|(_, upload)| upload.storage_key.clone())
            .collect()
    }
}

/// Outcome of one retention sweep over the store.
#[derive(Debug, Default)]
pub struct SweepResult {
    pub expired_sessions: usize,
    pub expired_uploads: usize,
    /// Files no longer referenced by any session.
    pub released_keys: Vec<String>,
}

/// Per-session pipeline state.
///
/// Each session is independent; the lock is held only for in-memory
/// bookkeeping, never across a call to storage or an external service.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<SessionId, SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session as seen, creating it when unknown.
    pub async fn touch(&self, session_id: &SessionId) {
        let mut sessions = self.inner.lock().await;
        sessions.entry(session_id.clone()).or_default().last_seen = Utc::now();
    }

    /// Run `f` against the session, creating it when unknown.
    pub async fn with_session<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut SessionEntry) -> R,
    ) -> R {
        let mut sessions = self.inner.lock().await;
        f(sessions.entry(session_id.clone()).or_default())
    }

    /// Run `f` against an existing session only.
    ///
    /// Used after an external call, when the session may have been cleared
    /// in the meantime.
    pub async fn with_existing<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut SessionEntry) -> R,
    ) -> Option<R> {
        let mut sessions = self.inner.lock().await;
        sessions.get_mut(session_id).map(f)
    }

    /// Ledger credentials of an authenticated session.
    pub async fn credentials(
        &self,
        session_id: &SessionId,
    ) -> Result<LedgerCredentials, AppError> {
        self.with_session(session_id, |entry| entry.auth.credentials().cloned())
            .await
    }

    /// Forget credentials the ledger rejected; the user must authorize again.
    pub async fn revoke_credentials(&self, session_id: &SessionId) {
        let revoked = self
            .with_existing(session_id, |entry| {
                let was_authenticated = entry.auth.is_authenticated();
                entry.auth = AuthState::Unauthenticated;
                was_authenticated
            })
            .await
            .unwrap_or(false);
        if revoked {
            tracing::info!("Ledger rejected the access token, session signed out");
        }
    }

    /// Remove a session, returning the storage keys that may be deleted.
    pub async fn remove(&self, session_id: &SessionId) -> Vec<String> {
        let mut sessions = self.inner.lock().await;
        sessions
            .remove(session_id)
            .map(|entry| entry.releasable_keys())
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Storage keys referenced by any live session.
    pub async fn referenced_keys(&self) -> HashSet<String> {
        let sessions = self.inner.lock().await;
        sessions
            .values()
            .flat_map(|entry| entry.uploads.values().map(|u| u.storage_key.clone()))
            .collect()
    }

    /// Drop idle sessions and stale uploads.
    ///
    /// Uploads whose submission is in flight are never released.
    pub async fn sweep(
        &self,
        now: DateTime<Utc>,
        session_ttl: Duration,
        upload_ttl: Duration,
    ) -> SweepResult {
        let mut result = SweepResult::default();
        let mut sessions = self.inner.lock().await;

        let idle: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, entry)| now - entry.last_seen > session_ttl)
            .filter(|(_, entry)| {
                !entry
                    .pending
                    .values()
                    .any(PendingSubmission::is_in_flight)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for session_id in idle {
            if let Some(entry) = sessions.remove(&session_id) {
                result.released_keys.extend(entry.releasable_keys());
                result.expired_sessions += 1;
            }
        }

        for entry in sessions.values_mut() {
            let stale: Vec<Uuid> = entry
                .uploads
                .iter()
                .filter(|(id, upload)| {
                    now - upload.created_at > upload_ttl && !entry.is_in_flight(id)
                })
                .map(|(id, _)| *id)
                .collect();

            for upload_id in stale {
                if let Some(key) = entry.discard_upload(&upload_id) {
                    result.released_keys.push(key);
                    result.expired_uploads += 1;
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use receiptly_core::models::ReceiptRecord;
    use rust_decimal::Decimal;

    fn upload(created_at: DateTime<Utc>) -> StoredUpload {
        let id = Uuid::new_v4();
        StoredUpload {
            handle: UploadHandle {
                id,
                original_filename: "receipt.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                size_bytes: 4,
            },
            storage_key: format!("receipts/{}-receipt.jpg", id),
            created_at,
        }
    }

    fn record() -> ReceiptRecord {
        ReceiptRecord {
            merchant: "Cafe Roma".to_string(),
            total: Decimal::new(2350, 2),
            currency_code: "EUR".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            category: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let alice = SessionId("a".repeat(32));
        let bob = SessionId("b".repeat(32));
        let stored = upload(Utc::now());
        let upload_id = stored.handle.id;

        store
            .with_session(&alice, |entry| {
                entry.uploads.insert(upload_id, stored);
            })
            .await;

        let bob_sees = store
            .with_session(&bob, |entry| entry.uploads.contains_key(&upload_id))
            .await;
        assert!(!bob_sees);
        assert_eq!(store.len().await, 2);
        assert!(store.with_existing(&SessionId("c".repeat(32)), |_| ()).await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_expires_old_uploads_but_not_in_flight_ones() {
        let store = SessionStore::new();
        let session = SessionId("a".repeat(32));
        let now = Utc::now();
        let old = upload(now - Duration::hours(30));
        let busy = upload(now - Duration::hours(30));
        let fresh = upload(now);
        let (old_key, busy_id) = (old.storage_key.clone(), busy.handle.id);

        store
            .with_session(&session, |entry| {
                let mut pending = PendingSubmission::new(busy.handle.clone(), record());
                pending.begin_submission(record()).unwrap();
                entry.pending.insert(busy_id, pending);
                for u in [old, busy, fresh] {
                    entry.uploads.insert(u.handle.id, u);
                }
            })
            .await;

        let result = store
            .sweep(now, Duration::hours(48), Duration::hours(24))
            .await;

        assert_eq!(result.expired_uploads, 1);
        assert_eq!(result.released_keys, vec![old_key]);
        let remaining = store
            .with_session(&session, |entry| entry.uploads.len())
            .await;
        assert_eq!(remaining, 2);
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_sessions() {
        let store = SessionStore::new();
        let session = SessionId("a".repeat(32));
        let stored = upload(Utc::now());
        let key = stored.storage_key.clone();

        store
            .with_session(&session, |entry| {
                entry.uploads.insert(stored.handle.id, stored);
                entry.last_seen = Utc::now() - Duration::hours(3);
            })
            .await;

        let result = store
            .sweep(Utc::now(), Duration::hours(1), Duration::hours(24))
            .await;

        assert_eq!(result.expired_sessions, 1);
        assert_eq!(result.released_keys, vec![key]);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_revoke_credentials() {
        let store = SessionStore::new();
        let session = SessionId("a".repeat(32));
        assert!(matches!(
            store.credentials(&session).await,
            Err(AppError::NotAuthenticated)
        ));

        store
            .with_session(&session, |entry| {
                entry.auth = AuthState::Authenticated(LedgerCredentials {
                    access_token: "token".to_string(),
                    group_id: 42,
                    user_id: None,
                });
            })
            .await;
        assert_eq!(store.credentials(&session).await.unwrap().group_id, 42);

        store.revoke_credentials(&session).await;
        assert!(store.credentials(&session).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_releases_files() {
        let store = SessionStore::new();
        let session = SessionId("a".repeat(32));
        let stored = upload(Utc::now());
        let key = stored.storage_key.clone();
        store
            .with_session(&session, |entry| {
                entry.uploads.insert(stored.handle.id, stored);
            })
            .await;

        assert!(store.referenced_keys().await.contains(&key));
        assert_eq!(store.remove(&session).await, vec![key]);
        assert!(store.referenced_keys().await.is_empty());
    }
}
