//! Storage setup and initialization

use anyhow::Result;
use receiptly_core::Config;
use receiptly_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing receipt storage...");
    let storage = create_storage(config).await?;
    Ok(storage)
}
