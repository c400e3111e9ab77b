//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use receiptly_core::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                AppError::NotFound(format!("Receipt file {} not found", key))
            }
            StorageError::InvalidKey(msg) => AppError::BadRequest(msg),
            StorageError::IoError(e) => AppError::Internal(format!("IO error: {}", e)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// A stored receipt file as seen by a listing.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

/// Storage abstraction trait
///
/// The pipeline only needs "persist bytes, return a key" plus reads and
/// deletes by key. Implementations must tolerate concurrent writers; keys
/// are unique per upload.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` and return its storage key.
    ///
    /// Bytes are durable when this returns.
    async fn upload(
        &self,
        upload_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key. Deleting a missing file succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// List every stored receipt file.
    async fn list(&self) -> StorageResult<Vec<StoredObject>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use receiptly_core::ErrorMetadata;

    #[test]
    fn test_storage_errors_map_to_app_errors() {
        let err: AppError = StorageError::NotFound("receipts/x.jpg".into()).into();
        assert_eq!(err.http_status_code(), 404);

        let err: AppError = StorageError::InvalidKey("bad".into()).into();
        assert_eq!(err.error_code(), "BAD_REQUEST");

        let err: AppError = StorageError::UploadFailed("disk full".into()).into();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.is_sensitive());
    }
}
