use crate::config::types::{
    CatalogConfig, Config, LookupConfig, QueueConfig, RunConfig, MAX_BATCH_SIZE,
};
use crate::ConfigError;
use url::Url;

/// Longest long-poll wait the queue transport accepts
const MAX_WAIT_SECONDS: u32 = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_queue_config(&config.queue)?;
    validate_lookup_config(&config.lookup)?;
    validate_run_config(&config.run)?;
    validate_catalog_config(&config.catalog)?;
    Ok(())
}

/// Validates queue configuration
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "queue url cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid queue url: {}", e)))?;

    if config.max_messages < 1 || config.max_messages > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "max_messages must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.max_messages
        )));
    }

    if config.wait_seconds > MAX_WAIT_SECONDS {
        return Err(ConfigError::Validation(format!(
            "wait_seconds must be <= {}, got {}",
            MAX_WAIT_SECONDS, config.wait_seconds
        )));
    }

    Ok(())
}

/// Validates lookup API configuration
fn validate_lookup_config(config: &LookupConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid lookup endpoint: {}", e)))?;

    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Lookup endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    if endpoint.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Lookup endpoint '{}' has no host",
            config.endpoint
        )));
    }

    for (name, value) in [
        ("access_key", &config.access_key),
        ("secret_key", &config.secret_key),
        ("associate_tag", &config.associate_tag),
        ("condition", &config.condition),
        ("id_type", &config.id_type),
        ("operation", &config.operation),
        ("response_group", &config.response_group),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates the invocation budget against the host ceiling
fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.time_budget_secs == 0 {
        return Err(ConfigError::Validation(
            "time_budget_secs must be > 0".to_string(),
        ));
    }

    if config.time_budget_secs >= config.host_max_secs {
        return Err(ConfigError::Validation(format!(
            "time_budget_secs ({}) must be strictly less than host_max_secs ({})",
            config.time_budget_secs, config.host_max_secs
        )));
    }

    Ok(())
}

/// Validates catalog configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
