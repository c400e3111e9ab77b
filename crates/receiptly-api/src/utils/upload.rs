//! Common utilities for the upload handler

use axum::extract::Multipart;
use receiptly_core::AppError;

/// A file read from a multipart form.
#[derive(Debug)]
pub struct MultipartFile {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Extract the file from a multipart form.
/// Only one field named "file" is accepted; multiple file fields are rejected.
///
/// Reading stops buffering once the file exceeds `max_size`; the rest of the
/// field is only counted so the error can report the real size.
pub async fn extract_multipart_file(
    mut multipart: Multipart,
    max_size: usize,
) -> Result<MultipartFile, AppError> {
    let mut file: Option<MultipartFile> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();
        if field_name != "file" {
            continue;
        }

        if file.is_some() {
            return Err(AppError::BadRequest(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "receipt".to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut data = Vec::new();
        let mut total: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) if total > max_size as u64 => {
                    tracing::debug!(error = %e, "Stopped reading oversized upload");
                    break;
                }
                Err(e) => {
                    return Err(AppError::BadRequest(format!(
                        "Failed to read file data: {}",
                        e
                    )))
                }
            };
            total += chunk.len() as u64;
            if total <= max_size as u64 {
                data.extend_from_slice(&chunk);
            }
        }

        if total > max_size as u64 {
            return Err(AppError::FileTooLarge {
                size: total,
                limit: max_size as u64,
            });
        }

        file = Some(MultipartFile {
            data,
            filename,
            content_type,
        });
    }

    file.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Sanitize filename to prevent path traversal and invalid characters.
/// Returns an error if the filename contains path traversal attempts.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    const MAX_FILENAME_LENGTH: usize = 255;

    let path = std::path::Path::new(filename);
    let filename_only = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    if filename_only.contains("..") {
        return Err(AppError::BadRequest(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim().is_empty() || sanitized.len() < 3 {
        return Ok("receipt".to_string());
    }

    Ok(sanitized)
}
