use crate::{LocalStorage, Storage, StorageResult};
use receiptly_core::Config;
use std::sync::Arc;

/// Create the storage backend from configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(config.upload_dir()).await?;
    tracing::info!(
        path = %storage.base_path().display(),
        "Local receipt storage initialized"
    );
    Ok(Arc::new(storage))
}
