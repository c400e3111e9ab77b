//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use receiptly_core::Config;
use receiptly_services::{LedgerClient, VisionClient};
use receiptly_storage::Storage;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let storage = storage::setup_storage(&config).await?;
    let (vision, ledger) = services::external_clients(&config);

    let (state, router) = build_app(config.clone(), storage.clone(), vision, ledger).await?;

    services::start_retention_sweeper(&config, &state, storage);

    Ok((state, router))
}

/// Wire state and routes around the given capabilities.
///
/// Used by `initialize_app` and by integration tests with in-process fakes.
pub async fn build_app(
    config: Config,
    storage: Arc<dyn Storage>,
    vision: Arc<dyn VisionClient>,
    ledger: Arc<dyn LedgerClient>,
) -> Result<(Arc<AppState>, axum::Router)> {
    let state = services::initialize_services(config.clone(), storage, vision, ledger);
    let router = routes::setup_routes(&config, state.clone()).await?;
    Ok((state, router))
}
