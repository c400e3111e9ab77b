//! Shared key generation for storage backends.

use uuid::Uuid;

pub const RECEIPTS_PREFIX: &str = "receipts";

/// Generate the storage key for an upload: `receipts/{upload_id}-{filename}`.
pub fn generate_storage_key(upload_id: Uuid, filename: &str) -> String {
    format!("{}/{}-{}", RECEIPTS_PREFIX, upload_id, filename)
}
