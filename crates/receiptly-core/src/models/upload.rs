use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque reference to a persisted receipt file.
///
/// Clients echo the handle back on confirm and submit; the storage key never
/// leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct UploadHandle {
    pub id: Uuid,
    pub original_filename: String,
    #[schema(example = "image/jpeg")]
    pub mime_type: String,
    pub size_bytes: u64,
}
