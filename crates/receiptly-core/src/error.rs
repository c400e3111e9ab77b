//! Error types module
//!
//! This module provides the error taxonomy used throughout Receiptly. All
//! pipeline failures are unified under the `AppError` enum, grouped into
//! input errors, auth errors, external-dependency errors and consistency
//! errors. Every variant describes its own HTTP presentation through
//! [`ErrorMetadata`].

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for external dependencies misbehaving
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "FILE_TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether the caller can recover without restarting the pipeline
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Whether the client should be sent through the authorize flow
    fn requires_authorization(&self) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not authenticated with the ledger service")]
    NotAuthenticated,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Stale submission: {0}")]
    StaleSubmission(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::BadRequest(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidFileType(_) => (
            415,
            "INVALID_FILE_TYPE",
            true,
            Some("Upload a JPEG, PNG, GIF, WebP or PDF receipt"),
            false,
            LogLevel::Debug,
        ),
        AppError::FileTooLarge { .. } => (
            413,
            "FILE_TOO_LARGE",
            true,
            Some("Reduce the file size or take a smaller photo"),
            false,
            LogLevel::Debug,
        ),
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            true,
            Some("Correct the highlighted receipt fields and confirm again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotAuthenticated => (
            401,
            "NOT_AUTHENTICATED",
            true,
            Some("Authorize with the ledger service and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::AuthenticationFailed(_) => (
            401,
            "AUTHENTICATION_FAILED",
            true,
            Some("Restart the authorization flow"),
            false,
            LogLevel::Warn,
        ),
        AppError::ExtractionUnavailable(_) => (
            502,
            "EXTRACTION_UNAVAILABLE",
            true,
            Some("Retry processing later or enter the receipt fields manually"),
            false,
            LogLevel::Warn,
        ),
        AppError::SubmissionFailed(_) => (
            502,
            "SUBMISSION_FAILED",
            true,
            Some("Check the ledger for a created expense before submitting again"),
            false,
            LogLevel::Warn,
        ),
        AppError::LedgerUnavailable(_) => (
            502,
            "LEDGER_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::StaleSubmission(_) => (
            409,
            "STALE_SUBMISSION",
            false,
            Some("Upload the receipt again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            true,
            Some("Wait for the running submission to finish"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            true,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Upload the receipt again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidFileType(_) => "InvalidFileType",
            AppError::FileTooLarge { .. } => "FileTooLarge",
            AppError::Validation(_) => "ValidationError",
            AppError::NotAuthenticated => "NotAuthenticated",
            AppError::AuthenticationFailed(_) => "AuthenticationFailed",
            AppError::ExtractionUnavailable(_) => "ExtractionUnavailable",
            AppError::SubmissionFailed(_) => "SubmissionFailed",
            AppError::LedgerUnavailable(_) => "LedgerUnavailable",
            AppError::StaleSubmission(_) => "StaleSubmission",
            AppError::Conflict(_) => "Conflict",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn requires_authorization(&self) -> bool {
        matches!(
            self,
            AppError::NotAuthenticated | AppError::AuthenticationFailed(_)
        )
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidFileType(ref msg) => msg.clone(),
            AppError::FileTooLarge { size, limit } => format!(
                "File is {} bytes, the maximum upload size is {} bytes",
                size, limit
            ),
            AppError::Validation(ref msg) => msg.clone(),
            AppError::NotAuthenticated => "Not authenticated with the ledger service".to_string(),
            AppError::AuthenticationFailed(ref msg) => {
                format!("Authentication with the ledger service failed: {}", msg)
            }
            AppError::ExtractionUnavailable(ref msg) => {
                format!("Receipt extraction is unavailable: {}", msg)
            }
            AppError::SubmissionFailed(ref msg) => {
                format!("The ledger service rejected the expense: {}", msg)
            }
            AppError::LedgerUnavailable(ref msg) => {
                format!("The ledger service is unavailable: {}", msg)
            }
            AppError::StaleSubmission(ref msg) => msg.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Storage(_) => "Failed to access receipt storage".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_file_too_large() {
        let err = AppError::FileTooLarge {
            size: 20_000_000,
            limit: 16_777_216,
        };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "FILE_TOO_LARGE");
        assert!(err.is_recoverable());
        assert!(err.client_message().contains("20000000"));
        assert!(err.client_message().contains("16777216"));
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_auth_errors_require_authorization() {
        assert!(AppError::NotAuthenticated.requires_authorization());
        assert!(AppError::AuthenticationFailed("state mismatch".into()).requires_authorization());
        assert!(!AppError::Validation("bad total".into()).requires_authorization());
        assert_eq!(AppError::NotAuthenticated.http_status_code(), 401);
    }

    #[test]
    fn test_error_metadata_external_errors_surface_cause() {
        let err = AppError::SubmissionFailed("unknown group 42".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "SUBMISSION_FAILED");
        assert!(err.client_message().contains("unknown group 42"));
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Warn);

        let err = AppError::ExtractionUnavailable("connection refused".to_string());
        assert_eq!(err.error_code(), "EXTRACTION_UNAVAILABLE");
        assert!(err.client_message().contains("connection refused"));
    }

    #[test]
    fn test_error_metadata_stale_submission_is_fatal() {
        let err = AppError::StaleSubmission("handle mismatch".to_string());
        assert_eq!(err.http_status_code(), 409);
        assert!(!err.is_recoverable());
        assert_eq!(err.suggested_action(), Some("Upload the receipt again"));
    }

    #[test]
    fn test_internal_errors_are_sensitive() {
        let err = AppError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Internal server error");
        assert_eq!(err.error_type(), "Internal");
    }
}
