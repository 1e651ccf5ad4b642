//! Configuration module for ASIN-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use asin_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("asin-ripple.toml")).unwrap();
//! println!("Time budget: {}s", config.run.time_budget_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    mask_secret, CatalogConfig, Config, DrainMode, LookupConfig, QueueConfig, RunConfig,
    DEFAULT_HOST_MAX_SECS, DEFAULT_LOOKUP_ENDPOINT, DEFAULT_TIME_BUDGET_SECS, MAX_BATCH_SIZE,
};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, load_config_with_hash, ENV_ACCESS_KEY,
    ENV_QUEUE_URL, ENV_SECRET_KEY,
};
