//! Test helpers: build the router around in-process fakes for the vision
//! model and the ledger.
//!
//! Run from workspace root: `cargo test -p receiptly-api`.

#![allow(dead_code)]

pub mod auth;
pub mod fakes;
pub mod fixtures;

use axum_test::TestServer;
use receiptly_core::{BaseConfig, Config, ReceiptlyConfig};
use receiptly_storage::{LocalStorage, Storage};
use std::sync::Arc;
use tempfile::TempDir;

use fakes::{FakeLedger, FakeVision};

pub const TEST_GROUP_ID: i64 = 42;
pub const TEST_MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024;

/// Test application: server, fakes, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<dyn Storage>,
    pub vision: Arc<FakeVision>,
    pub ledger: Arc<FakeLedger>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of receipt files currently stored.
    pub async fn stored_files(&self) -> usize {
        self.storage.list().await.unwrap().len()
    }
}

pub fn create_test_config(upload_dir: &str) -> Config {
    Config(Box::new(ReceiptlyConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            external_base_url: "http://localhost:5001".to_string(),
            session_secret: "test-session-secret-with-at-least-32-chars".to_string(),
            session_ttl_secs: 3600,
        },
        ledger_consumer_key: "test-consumer-key".to_string(),
        ledger_consumer_secret: "test-consumer-secret".to_string(),
        ledger_group_id: TEST_GROUP_ID,
        ledger_api_base_url: "http://ledger.invalid/api/v3.0".to_string(),
        ledger_auth_base_url: "http://ledger.invalid/oauth".to_string(),
        vision_api_key: "test-vision-key".to_string(),
        vision_api_base_url: "http://vision.invalid/v1".to_string(),
        vision_model: "test-model".to_string(),
        vision_max_tokens: 300,
        max_upload_size_bytes: TEST_MAX_UPLOAD_BYTES,
        allowed_file_types: ["image/jpeg", "image/png", "image/gif", "image/webp", "application/pdf"]
            .iter()
            .map(|t| t.to_string())
            .collect(),
        fallback_currency: "EUR".to_string(),
        upload_dir: upload_dir.to_string(),
        upload_retention_hours: 24,
        retention_sweep_interval_secs: 0,
        external_timeout_secs: 5,
    }))
}

/// Setup test app with local storage in a temp dir and a two-member group.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(temp_dir.path()).await.unwrap());
    let config = create_test_config(&temp_dir.path().to_string_lossy());

    let vision = Arc::new(FakeVision::new(fixtures::VISION_ANSWER));
    let ledger = Arc::new(FakeLedger::new(fixtures::members(2)));

    let (_state, router) = receiptly_api::setup::build_app(
        config,
        storage.clone(),
        vision.clone(),
        ledger.clone(),
    )
    .await
    .unwrap();

    TestApp {
        server: TestServer::new(router).unwrap(),
        storage,
        vision,
        ledger,
        _temp_dir: temp_dir,
    }
}
