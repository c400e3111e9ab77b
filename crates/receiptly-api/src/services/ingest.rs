//! File ingest: validate an uploaded receipt, persist it, hand out an opaque handle

use chrono::Utc;
use receiptly_core::models::UploadHandle;
use receiptly_core::AppError;
use receiptly_storage::Storage;
use std::sync::Arc;
use uuid::Uuid;

use crate::session::StoredUpload;
use crate::utils::upload::{normalize_mime_type, sanitize_filename};

/// Detect the content type from the file's leading bytes.
///
/// The declared content type and extension are not trusted.
pub fn sniff_mime_type(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else if data.starts_with(b"%PDF-") {
        Some("application/pdf")
    } else {
        None
    }
}

#[derive(Clone)]
pub struct IngestService {
    storage: Arc<dyn Storage>,
    max_upload_size_bytes: usize,
    allowed_file_types: Vec<String>,
}

impl IngestService {
    pub fn new(
        storage: Arc<dyn Storage>,
        max_upload_size_bytes: usize,
        allowed_file_types: Vec<String>,
    ) -> Self {
        Self {
            storage,
            max_upload_size_bytes,
            allowed_file_types,
        }
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.max_upload_size_bytes
    }

    /// Validate and persist an upload.
    ///
    /// Size and type are checked before anything is written; the bytes are
    /// durable once this returns.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn ingest(
        &self,
        data: Vec<u8>,
        filename: &str,
        declared_type: &str,
    ) -> Result<StoredUpload, AppError> {
        let size_bytes = data.len() as u64;
        if data.len() > self.max_upload_size_bytes {
            return Err(AppError::FileTooLarge {
                size: size_bytes,
                limit: self.max_upload_size_bytes as u64,
            });
        }

        let mime_type = sniff_mime_type(&data)
            .filter(|sniffed| self.allowed_file_types.iter().any(|t| t == sniffed))
            .ok_or_else(|| {
                AppError::InvalidFileType(format!(
                    "Unsupported file content. Allowed types: {}",
                    self.allowed_file_types.join(", ")
                ))
            })?;

        let declared = normalize_mime_type(declared_type);
        if declared != mime_type {
            tracing::debug!(
                declared = %declared,
                sniffed = mime_type,
                "Declared content type differs from file content"
            );
        }

        let filename = sanitize_filename(filename)?;
        let upload_id = Uuid::new_v4();
        let storage_key = self
            .storage
            .upload(upload_id, &filename, mime_type, data)
            .await?;

        tracing::info!(
            upload_id = %upload_id,
            mime_type = mime_type,
            size_bytes,
            "Receipt stored"
        );

        Ok(StoredUpload {
            handle: UploadHandle {
                id: upload_id,
                original_filename: filename,
                mime_type: mime_type.to_string(),
                size_bytes,
            },
            storage_key,
            created_at: Utc::now(),
        })
    }
}
