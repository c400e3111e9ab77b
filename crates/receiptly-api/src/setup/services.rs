//! Service initialization and application state setup

use receiptly_core::Config;
use receiptly_services::{LedgerClient, OpenAiVisionClient, SplitwiseClient, VisionClient};
use receiptly_storage::Storage;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::handshake::AuthHandshake;
use crate::services::{
    CatalogService, ExtractionService, IngestService, PipelineController, RetentionSweeper,
    SubmissionService,
};
use crate::session::{CookieSigner, SessionStore};
use crate::state::{AppState, SessionState};

/// HTTP clients for the vision model and the ledger.
pub fn external_clients(config: &Config) -> (Arc<dyn VisionClient>, Arc<dyn LedgerClient>) {
    let timeout = Duration::from_secs(config.external_timeout_secs());

    let vision = OpenAiVisionClient::new(
        config.vision_api_base_url(),
        config.vision_api_key(),
        config.vision_model(),
        config.vision_max_tokens(),
        timeout,
    );
    let ledger = SplitwiseClient::new(
        config.ledger_api_base_url(),
        config.ledger_auth_base_url(),
        config.ledger_consumer_key(),
        config.ledger_consumer_secret(),
        timeout,
    );

    tracing::info!(
        vision_model = %config.vision_model(),
        ledger_api = %config.ledger_api_base_url(),
        timeout_secs = config.external_timeout_secs(),
        "External clients initialized"
    );

    (Arc::new(vision), Arc::new(ledger))
}

/// Initialize all services, returning the application state
pub fn initialize_services(
    config: Config,
    storage: Arc<dyn Storage>,
    vision: Arc<dyn VisionClient>,
    ledger: Arc<dyn LedgerClient>,
) -> Arc<AppState> {
    let store = SessionStore::new();
    let signer = CookieSigner::new(config.session_secret(), config.is_production());
    let fallback_currency = config.fallback_currency().to_string();

    let ingest = IngestService::new(
        storage.clone(),
        config.max_upload_size_bytes(),
        config.allowed_file_types().to_vec(),
    );
    let extraction = ExtractionService::new(
        storage.clone(),
        vision,
        ledger.clone(),
        fallback_currency.clone(),
    );
    let submission = SubmissionService::new(storage.clone(), ledger.clone());

    let pipeline = PipelineController::new(
        store.clone(),
        storage.clone(),
        ingest,
        extraction,
        submission,
        fallback_currency,
    );
    let auth = AuthHandshake::new(
        store.clone(),
        ledger.clone(),
        storage,
        config.oauth_callback_url(),
        config.ledger_group_id(),
    );
    let catalog = CatalogService::new(store.clone(), ledger);

    Arc::new(AppState {
        config,
        session: SessionState { store, signer },
        auth,
        pipeline,
        catalog,
    })
}

/// Start the background retention sweep over the session store.
pub fn start_retention_sweeper(
    config: &Config,
    state: &Arc<AppState>,
    storage: Arc<dyn Storage>,
) -> Option<tokio::task::JoinHandle<()>> {
    let sweeper = Arc::new(RetentionSweeper::new(
        state.session.store.clone(),
        storage,
        config.session_ttl_secs(),
        config.upload_retention_hours(),
        config.retention_sweep_interval_secs(),
    ));

    let handle = sweeper.start();
    if handle.is_some() {
        tracing::info!(
            interval_secs = config.retention_sweep_interval_secs(),
            upload_retention_hours = config.upload_retention_hours(),
            "Retention sweep started"
        );
    }
    handle
}
