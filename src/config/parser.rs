use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable overriding `lookup.access-key`
pub const ENV_ACCESS_KEY: &str = "ASIN_RIPPLE_ACCESS_KEY";

/// Environment variable overriding `lookup.secret-key`
pub const ENV_SECRET_KEY: &str = "ASIN_RIPPLE_SECRET_KEY";

/// Environment variable overriding `queue.url`
pub const ENV_QUEUE_URL: &str = "ASIN_RIPPLE_QUEUE_URL";

/// Loads and parses a configuration file from the given path
///
/// Credentials and the queue reference may be supplied through the
/// environment instead of the file; environment values win.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use asin_ripple::config::load_config;
///
/// let config = load_config(Path::new("asin-ripple.toml")).unwrap();
/// println!("Batch size: {}", config.queue.max_messages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_overrides(&mut config, |key| std::env::var(key).ok());

    validate(&config)?;

    Ok(config)
}

/// Applies credential overrides from a key lookup (normally the environment)
///
/// Empty values are ignored so an exported-but-blank variable cannot wipe a
/// value from the file.
pub fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(access_key) = non_empty(ENV_ACCESS_KEY) {
        config.lookup.access_key = access_key;
    }
    if let Some(secret_key) = non_empty(ENV_SECRET_KEY) {
        config.lookup.secret_key = secret_key;
    }
    if let Some(queue_url) = non_empty(ENV_QUEUE_URL) {
        config.queue.url = queue_url;
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be correlated with the config they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
