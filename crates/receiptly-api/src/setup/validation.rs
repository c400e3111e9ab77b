//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use receiptly_core::Config;

/// Validate critical configuration values
///
/// Runs the field checks of [`Config::validate`] plus the ones that only matter
/// to the HTTP service.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let base_url = config.external_base_url();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(anyhow::anyhow!(
            "EXTERNAL_BASE_URL must be an http(s) URL, got '{}'",
            base_url
        ));
    }

    // Session cookies are marked Secure in production and would never come back over http.
    if config.is_production() && !base_url.starts_with("https://") {
        return Err(anyhow::anyhow!(
            "EXTERNAL_BASE_URL must use https in production"
        ));
    }

    if config.external_timeout_secs() == 0 {
        return Err(anyhow::anyhow!("EXTERNAL_TIMEOUT_SECS cannot be 0"));
    }

    if config.session_ttl_secs() < 300 {
        tracing::warn!(
            session_ttl_secs = config.session_ttl_secs(),
            "SESSION_TTL_SECS is very short - users may be signed out mid-receipt"
        );
    }

    if config.upload_retention_hours() <= 0 {
        return Err(anyhow::anyhow!(
            "UPLOAD_RETENTION_HOURS must be greater than 0"
        ));
    }

    if config.retention_sweep_interval_secs() == 0 {
        tracing::warn!("Retention sweep disabled - abandoned receipts are kept until logout");
    }

    Ok(())
}
