//! ASIN-Ripple: a queue-driven catalog crawler
//!
//! This crate drains a queue of catalog identifiers, resolves each one against
//! a signed lookup API, persists the normalized record, and re-enqueues the
//! related identifiers it discovers that are not already known.

pub mod config;
pub mod crawler;
pub mod output;
pub mod queue;
pub mod signing;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for ASIN-Ripple operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue transport error: {0}")]
    Transport(#[from] queue::QueueError),

    #[error("Lookup request failed for {identifier}: {source}")]
    Fetch {
        identifier: String,
        source: reqwest::Error,
    },

    #[error("Lookup endpoint returned HTTP {status} for {identifier}")]
    FetchStatus { identifier: String, status: u16 },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::OrchestratorState,
        to: state::OrchestratorState,
    },
}

impl CrawlError {
    /// Returns true if this error must abort the whole invocation
    ///
    /// Lookup failures only cost the current item; the queue transport, an
    /// unreachable catalog store and programming errors take the run down.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Fetch { .. } | Self::FetchStatus { .. } => false,
            Self::Storage(e) => e.is_unavailable(),
            _ => true,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for ASIN-Ripple operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, DrainMode};
pub use crawler::{Coordinator, Fetcher, LookupResult, RunReport, RunStatus};
pub use queue::{QueueClient, QueueMessage};
pub use state::{InvocationContext, ItemOutcome, OrchestratorState, SeenSet, TimeBudget};
pub use storage::{CatalogProduct, CatalogStore, LookupRecord, SqliteCatalog};
