use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Default lookup endpoint (host and path both take part in the signature)
pub const DEFAULT_LOOKUP_ENDPOINT: &str = "http://webservices.amazon.com/onca/xml";

/// Default wall-clock budget for one invocation (4m30s)
pub const DEFAULT_TIME_BUDGET_SECS: u64 = 270;

/// Default maximum execution time allowed by the host
pub const DEFAULT_HOST_MAX_SECS: u64 = 300;

/// Upper bound the queue transport accepts for a single receive
pub const MAX_BATCH_SIZE: u32 = 10;

/// Main configuration structure for ASIN-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub queue: QueueConfig,
    pub lookup: LookupConfig,
    #[serde(default)]
    pub run: RunConfig,
    pub catalog: CatalogConfig,
}

/// Queue transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Queue reference (SQS queue URL)
    #[serde(default)]
    pub url: String,

    /// Maximum number of messages requested per poll
    #[serde(rename = "max-messages", default = "default_max_messages")]
    pub max_messages: u32,

    /// Long-poll wait time in seconds (0 disables long polling)
    #[serde(rename = "wait-seconds", default)]
    pub wait_seconds: u32,

    /// Optional region override for the transport client
    #[serde(default)]
    pub region: Option<String>,
}

/// Lookup API configuration
#[derive(Clone, Deserialize)]
pub struct LookupConfig {
    /// Full endpoint URL of the lookup operation
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(rename = "access-key", default)]
    pub access_key: String,

    #[serde(rename = "secret-key", default)]
    pub secret_key: String,

    #[serde(rename = "associate-tag")]
    pub associate_tag: String,

    #[serde(default = "default_condition")]
    pub condition: String,

    #[serde(rename = "id-type", default = "default_id_type")]
    pub id_type: String,

    #[serde(default = "default_operation")]
    pub operation: String,

    #[serde(rename = "response-group", default = "default_response_group")]
    pub response_group: String,
}

impl fmt::Debug for LookupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &mask_secret(&self.access_key))
            .field("secret_key", &"********")
            .field("associate_tag", &self.associate_tag)
            .field("condition", &self.condition)
            .field("id_type", &self.id_type)
            .field("operation", &self.operation)
            .field("response_group", &self.response_group)
            .finish()
    }
}

/// Invocation policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Wall-clock budget checked between batches
    #[serde(rename = "time-budget-secs", default = "default_time_budget_secs")]
    pub time_budget_secs: u64,

    /// Maximum execution time of the host; the budget must stay below it
    #[serde(rename = "host-max-secs", default = "default_host_max_secs")]
    pub host_max_secs: u64,

    #[serde(rename = "drain-mode", default)]
    pub drain_mode: DrainMode,
}

impl RunConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            host_max_secs: DEFAULT_HOST_MAX_SECS,
            drain_mode: DrainMode::default(),
        }
    }
}

/// Whether an invocation keeps polling until the budget runs out or stops
/// after the first batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrainMode {
    /// Re-poll after every batch until the queue is empty or the budget expires
    #[default]
    Continuous,

    /// Process a single batch and stop
    SingleBatch,
}

impl fmt::Display for DrainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::SingleBatch => write!(f, "single-batch"),
        }
    }
}

/// Catalog store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Path to the SQLite catalog database
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Masks all but the last four characters of a credential
pub fn mask_secret(value: &str) -> String {
    let visible: String = value
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", visible)
    }
}

fn default_max_messages() -> u32 {
    MAX_BATCH_SIZE
}

fn default_endpoint() -> String {
    DEFAULT_LOOKUP_ENDPOINT.to_string()
}

fn default_condition() -> String {
    "New".to_string()
}

fn default_id_type() -> String {
    "ASIN".to_string()
}

fn default_operation() -> String {
    "ItemLookup".to_string()
}

fn default_response_group() -> String {
    "Large".to_string()
}

fn default_time_budget_secs() -> u64 {
    DEFAULT_TIME_BUDGET_SECS
}

fn default_host_max_secs() -> u64 {
    DEFAULT_HOST_MAX_SECS
}
