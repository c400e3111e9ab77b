use chrono::{Duration as ChronoDuration, Utc};
use receiptly_storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::session::SessionStore;

/// Counts from one retention pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetentionReport {
    pub expired_sessions: usize,
    pub expired_uploads: usize,
    pub deleted_files: usize,
    pub orphaned_files: usize,
}

/// Periodically drops idle sessions and deletes receipt files nobody will
/// submit anymore.
#[derive(Clone)]
pub struct RetentionSweeper {
    sessions: SessionStore,
    storage: Arc<dyn Storage>,
    session_ttl: ChronoDuration,
    upload_ttl: ChronoDuration,
    sweep_interval: Duration,
}

impl RetentionSweeper {
    pub fn new(
        sessions: SessionStore,
        storage: Arc<dyn Storage>,
        session_ttl_secs: u64,
        upload_retention_hours: i64,
        sweep_interval_secs: u64,
    ) -> Self {
        Self {
            sessions,
            storage,
            session_ttl: ChronoDuration::seconds(session_ttl_secs as i64),
            upload_ttl: ChronoDuration::hours(upload_retention_hours),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        }
    }

    /// Start the background sweep. A zero interval disables it.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if self.sweep_interval.is_zero() {
            tracing::info!("Retention sweep disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut sweep_interval = interval(self.sweep_interval);
            // The first tick completes immediately.
            sweep_interval.tick().await;

            loop {
                sweep_interval.tick().await;

                tracing::debug!("Starting scheduled retention sweep");

                if let Err(e) = self.sweep_once().await {
                    tracing::error!(error = %e, "Retention sweep failed");
                }
            }
        }))
    }

    /// Run one sweep: expire sessions and uploads, then remove orphaned files.
    #[tracing::instrument(skip(self), fields(retention.operation = "sweep"))]
    pub async fn sweep_once(&self) -> Result<RetentionReport, anyhow::Error> {
        let now = Utc::now();
        let swept = self
            .sessions
            .sweep(now, self.session_ttl, self.upload_ttl)
            .await;

        let mut report = RetentionReport {
            expired_sessions: swept.expired_sessions,
            expired_uploads: swept.expired_uploads,
            ..Default::default()
        };

        for key in swept.released_keys {
            match self.storage.delete(&key).await {
                Ok(()) => report.deleted_files += 1,
                Err(e) => {
                    tracing::error!(error = %e, storage_key = %key, "Failed to delete receipt file")
                }
            }
        }

        let referenced = self.sessions.referenced_keys().await;
        for object in self.storage.list().await? {
            if referenced.contains(&object.key) || now - object.modified_at <= self.upload_ttl {
                continue;
            }
            tracing::info!(storage_key = %object.key, "Deleting orphaned receipt file");
            match self.storage.delete(&object.key).await {
                Ok(()) => report.orphaned_files += 1,
                Err(e) => tracing::error!(
                    error = %e,
                    storage_key = %object.key,
                    "Failed to delete orphaned file"
                ),
            }
        }

        if report != RetentionReport::default() {
            tracing::info!(
                expired_sessions = report.expired_sessions,
                expired_uploads = report.expired_uploads,
                deleted_files = report.deleted_files,
                orphaned_files = report.orphaned_files,
                "Retention sweep completed"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionId, StoredUpload};
    use receiptly_core::models::UploadHandle;
    use receiptly_storage::LocalStorage;
    use uuid::Uuid;

    async fn stored(storage: &Arc<dyn Storage>, age: ChronoDuration) -> StoredUpload {
        let id = Uuid::new_v4();
        let storage_key = storage
            .upload(id, "receipt.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF])
            .await
            .unwrap();
        StoredUpload {
            handle: UploadHandle {
                id,
                original_filename: "receipt.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                size_bytes: 3,
            },
            storage_key,
            created_at: Utc::now() - age,
        }
    }

    #[tokio::test]
    async fn test_sweep_deletes_expired_uploads_only() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let sessions = SessionStore::new();
        let session = SessionId("a".repeat(32));

        let old = stored(&storage, ChronoDuration::hours(48)).await;
        let fresh = stored(&storage, ChronoDuration::minutes(5)).await;
        let (old_key, fresh_key) = (old.storage_key.clone(), fresh.storage_key.clone());
        sessions
            .with_session(&session, |entry| {
                entry.uploads.insert(old.handle.id, old);
                entry.uploads.insert(fresh.handle.id, fresh);
            })
            .await;

        let sweeper = RetentionSweeper::new(sessions.clone(), storage.clone(), 3600, 24, 0);
        let report = sweeper.sweep_once().await.unwrap();

        assert_eq!(report.expired_uploads, 1);
        assert_eq!(report.deleted_files, 1);
        assert_eq!(report.expired_sessions, 0);
        assert!(!storage.exists(&old_key).await.unwrap());
        assert!(storage.exists(&fresh_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_keeps_recent_unreferenced_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let upload = stored(&storage, ChronoDuration::zero()).await;

        let sweeper = RetentionSweeper::new(SessionStore::new(), storage.clone(), 3600, 24, 0);
        let report = sweeper.sweep_once().await.unwrap();

        assert_eq!(report.orphaned_files, 0);
        assert!(storage.exists(&upload.storage_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_interval_disables_background_task() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let sweeper = Arc::new(RetentionSweeper::new(SessionStore::new(), storage, 3600, 24, 0));

        assert!(sweeper.start().is_none());
    }
}
