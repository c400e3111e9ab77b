//! Configuration module
//!
//! This module provides the configuration structures for the API service:
//! server and session settings, ledger and vision-model credentials, and the
//! upload/retention policy.

use std::env;

// Common constants
const SERVER_PORT: u16 = 5001;
const SESSION_TTL_SECS: u64 = 86_400;
const MAX_UPLOAD_SIZE_MB: usize = 16;
const VISION_MAX_TOKENS: u32 = 300;
const UPLOAD_RETENTION_HOURS: i64 = 24;
const RETENTION_SWEEP_INTERVAL_SECS: u64 = 3600;
const EXTERNAL_TIMEOUT_SECS: u64 = 120;

const DEFAULT_ALLOWED_FILE_TYPES: &str =
    "image/jpeg,image/png,image/gif,image/webp,application/pdf";

/// Base configuration for the HTTP surface and sessions
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Public base URL; the OAuth callback target is `{external_base_url}/callback`
    pub external_base_url: String,
    pub session_secret: String,
    pub session_ttl_secs: u64,
}

/// Receipt pipeline configuration
#[derive(Clone, Debug)]
pub struct ReceiptlyConfig {
    pub base: BaseConfig,
    // Ledger service
    pub ledger_consumer_key: String,
    pub ledger_consumer_secret: String,
    pub ledger_group_id: i64,
    pub ledger_api_base_url: String,
    pub ledger_auth_base_url: String,
    // Vision model
    pub vision_api_key: String,
    pub vision_api_base_url: String,
    pub vision_model: String,
    pub vision_max_tokens: u32,
    // Uploads
    pub max_upload_size_bytes: usize,
    pub allowed_file_types: Vec<String>,
    pub fallback_currency: String,
    pub upload_dir: String,
    /// Abandoned uploads and pending submissions older than this are swept.
    pub upload_retention_hours: i64,
    /// 0 = disabled.
    pub retention_sweep_interval_secs: u64,
    pub external_timeout_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ReceiptlyConfig>);

impl Config {
    fn inner(&self) -> &ReceiptlyConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ReceiptlyConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn external_base_url(&self) -> &str {
        &self.inner().base.external_base_url
    }

    /// Redirect target registered with the identity provider.
    pub fn oauth_callback_url(&self) -> String {
        format!(
            "{}/callback",
            self.inner().base.external_base_url.trim_end_matches('/')
        )
    }

    pub fn session_secret(&self) -> &str {
        &self.inner().base.session_secret
    }

    pub fn session_ttl_secs(&self) -> u64 {
        self.inner().base.session_ttl_secs
    }

    pub fn ledger_consumer_key(&self) -> &str {
        &self.inner().ledger_consumer_key
    }

    pub fn ledger_consumer_secret(&self) -> &str {
        &self.inner().ledger_consumer_secret
    }

    pub fn ledger_group_id(&self) -> i64 {
        self.inner().ledger_group_id
    }

    pub fn ledger_api_base_url(&self) -> &str {
        &self.inner().ledger_api_base_url
    }

    pub fn ledger_auth_base_url(&self) -> &str {
        &self.inner().ledger_auth_base_url
    }

    pub fn vision_api_key(&self) -> &str {
        &self.inner().vision_api_key
    }

    pub fn vision_api_base_url(&self) -> &str {
        &self.inner().vision_api_base_url
    }

    pub fn vision_model(&self) -> &str {
        &self.inner().vision_model
    }

    pub fn vision_max_tokens(&self) -> u32 {
        self.inner().vision_max_tokens
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn allowed_file_types(&self) -> &[String] {
        &self.inner().allowed_file_types
    }

    pub fn fallback_currency(&self) -> &str {
        &self.inner().fallback_currency
    }

    pub fn upload_dir(&self) -> &str {
        &self.inner().upload_dir
    }

    pub fn upload_retention_hours(&self) -> i64 {
        self.inner().upload_retention_hours
    }

    pub fn retention_sweep_interval_secs(&self) -> u64 {
        self.inner().retention_sweep_interval_secs
    }

    pub fn external_timeout_secs(&self) -> u64 {
        self.inner().external_timeout_secs
    }
}

fn is_production_env(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

fn required(name: &str) -> Result<String, anyhow::Error> {
    env::var(name).map_err(|_| anyhow::anyhow!("{} must be set", name))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ReceiptlyConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            external_base_url: env::var("EXTERNAL_BASE_URL")
                .or_else(|_| env::var("WEB_APP_URL"))
                .unwrap_or_else(|_| format!("http://localhost:{}", SERVER_PORT)),
            session_secret: required("SESSION_SECRET")?,
            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .unwrap_or_else(|_| SESSION_TTL_SECS.to_string())
                .parse()
                .unwrap_or(SESSION_TTL_SECS),
        };

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let config = ReceiptlyConfig {
            base,
            ledger_consumer_key: required("LEDGER_CONSUMER_KEY")?,
            ledger_consumer_secret: required("LEDGER_CONSUMER_SECRET")?,
            ledger_group_id: required("LEDGER_GROUP_ID")?
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("LEDGER_GROUP_ID must be a numeric group id"))?,
            ledger_api_base_url: env::var("LEDGER_API_BASE_URL")
                .unwrap_or_else(|_| "https://secure.splitwise.com/api/v3.0".to_string()),
            ledger_auth_base_url: env::var("LEDGER_AUTH_BASE_URL")
                .unwrap_or_else(|_| "https://secure.splitwise.com/oauth".to_string()),
            vision_api_key: required("VISION_API_KEY")?,
            vision_api_base_url: env::var("VISION_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            vision_model: env::var("VISION_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            vision_max_tokens: env::var("VISION_MAX_TOKENS")
                .unwrap_or_else(|_| VISION_MAX_TOKENS.to_string())
                .parse()
                .unwrap_or(VISION_MAX_TOKENS),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            allowed_file_types: parse_list(
                &env::var("ALLOWED_FILE_TYPES")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_FILE_TYPES.to_string()),
            ),
            fallback_currency: env::var("FALLBACK_CURRENCY")
                .unwrap_or_else(|_| "EUR".to_string())
                .trim()
                .to_uppercase(),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            upload_retention_hours: env::var("UPLOAD_RETENTION_HOURS")
                .unwrap_or_else(|_| UPLOAD_RETENTION_HOURS.to_string())
                .parse()
                .unwrap_or(UPLOAD_RETENTION_HOURS),
            retention_sweep_interval_secs: env::var("RETENTION_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| RETENTION_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(RETENTION_SWEEP_INTERVAL_SECS),
            external_timeout_secs: env::var("EXTERNAL_TIMEOUT_SECS")
                .unwrap_or_else(|_| EXTERNAL_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(EXTERNAL_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.session_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "SESSION_SECRET must be at least 32 characters long"
            ));
        }

        if is_production_env(&self.base.environment)
            && self.base.cors_origins.iter().any(|o| o == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.ledger_consumer_key.trim().is_empty()
            || self.ledger_consumer_secret.trim().is_empty()
        {
            return Err(anyhow::anyhow!(
                "LEDGER_CONSUMER_KEY and LEDGER_CONSUMER_SECRET must not be empty"
            ));
        }

        if self.vision_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("VISION_API_KEY must not be empty"));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.fallback_currency.len() != 3
            || !self
                .fallback_currency
                .chars()
                .all(|c| c.is_ascii_uppercase())
        {
            return Err(anyhow::anyhow!(
                "FALLBACK_CURRENCY must be a 3-letter ISO 4217 code, got '{}'",
                self.fallback_currency
            ));
        }

        if self.allowed_file_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_FILE_TYPES must not be empty"));
        }

        if let Some(bad) = self
            .allowed_file_types
            .iter()
            .find(|t| !t.starts_with("image/") && t.as_str() != "application/pdf")
        {
            return Err(anyhow::anyhow!(
                "ALLOWED_FILE_TYPES may only contain image types and application/pdf, got '{}'",
                bad
            ));
        }

        if self.upload_retention_hours <= 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_RETENTION_HOURS must be greater than 0"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReceiptlyConfig {
        ReceiptlyConfig {
            base: BaseConfig {
                server_port: 5001,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                external_base_url: "http://localhost:5001/".to_string(),
                session_secret: "test-secret-key-min-32-characters-long".to_string(),
                session_ttl_secs: 3600,
            },
            ledger_consumer_key: "key".to_string(),
            ledger_consumer_secret: "secret".to_string(),
            ledger_group_id: 42,
            ledger_api_base_url: "http://ledger.test".to_string(),
            ledger_auth_base_url: "http://ledger.test/oauth".to_string(),
            vision_api_key: "sk-test".to_string(),
            vision_api_base_url: "http://vision.test".to_string(),
            vision_model: "gpt-4o".to_string(),
            vision_max_tokens: 300,
            max_upload_size_bytes: 16 * 1024 * 1024,
            allowed_file_types: parse_list(DEFAULT_ALLOWED_FILE_TYPES),
            fallback_currency: "EUR".to_string(),
            upload_dir: "uploads".to_string(),
            upload_retention_hours: 24,
            retention_sweep_interval_secs: 0,
            external_timeout_secs: 30,
        }
    }

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_short_session_secret_rejected() {
        let mut config = sample();
        config.base.session_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let mut config = sample();
        config.base.environment = "production".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CORS_ORIGINS"));
    }

    #[test]
    fn test_fallback_currency_must_be_iso_code() {
        let mut config = sample();
        config.fallback_currency = "EURO".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allowed_types_restricted_to_images_and_pdf() {
        let mut config = sample();
        config.allowed_file_types.push("text/plain".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_callback_url_trims_trailing_slash() {
        let config = Config(Box::new(sample()));
        assert_eq!(config.oauth_callback_url(), "http://localhost:5001/callback");
        assert!(!config.is_production());
    }

    #[test]
    fn test_parse_list_normalizes_entries() {
        assert_eq!(
            parse_list(" Image/JPEG, ,application/pdf "),
            vec!["image/jpeg".to_string(), "application/pdf".to_string()]
        );
    }
}
