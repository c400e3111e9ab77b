//! Vision-model capability

mod openai;

pub use openai::OpenAiVisionClient;

use async_trait::async_trait;
use receiptly_core::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("vision request failed: {0}")]
    Request(String),

    #[error("vision API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid vision response: {0}")]
    InvalidResponse(String),
}

impl From<VisionError> for AppError {
    fn from(err: VisionError) -> Self {
        AppError::ExtractionUnavailable(err.to_string())
    }
}

/// One receipt file to be read by the model.
#[derive(Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for VisionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionRequest")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.data.len())
            .finish()
    }
}

/// Given receipt bytes, return the model's free-form answer.
///
/// Errors mean the capability itself failed; incomplete answers are the
/// caller's problem.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn extract(&self, request: VisionRequest) -> Result<String, VisionError>;
}
