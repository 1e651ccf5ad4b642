//! Serverless entry point
//!
//! Each event triggers one invocation. The payload is ignored; the
//! configuration is read from `ASIN_RIPPLE_CONFIG`.

use asin_ripple::config::load_config_with_hash;
use asin_ripple::crawler::run_invocation;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "ASIN_RIPPLE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "/var/task/asin-ripple.toml";

fn config_path() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

async fn handle_request(_event: LambdaEvent<Value>) -> Result<Value, Error> {
    let path = config_path();
    let (config, hash) = load_config_with_hash(&path)
        .map_err(|error| Error::from(format!("failed to load {}: {error}", path.display())))?;
    tracing::info!("Configuration loaded (hash: {})", hash);

    let report = run_invocation(&config).await.map_err(|error| {
        tracing::error!("Invocation failed: {}", error);
        Error::from(error.to_string())
    })?;

    Ok(json!({ "status": report.status.terminal_status() }))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("asin_ripple=info,warn")),
        )
        .with_target(false)
        .without_time()
        .compact()
        .init();

    lambda_runtime::run(service_fn(handle_request)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_defaults_to_task_root() {
        if std::env::var(CONFIG_ENV).is_err() {
            assert_eq!(config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
        }
    }
}
