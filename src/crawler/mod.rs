//! Crawler module for the lookup pipeline
//!
//! This module contains the core crawling logic, including:
//! - Signed lookup fetching
//! - Response parsing and validation
//! - Expansion of related identifiers
//! - The invocation polling loop

mod coordinator;
mod expansion;
mod fetcher;
mod parser;

pub use coordinator::{Coordinator, RunReport, RunSettings, RunStatus, TERMINAL_STATUS};
pub use expansion::{expand, ExpansionReport};
pub use fetcher::{build_http_client, Fetcher, Lookup};
pub use parser::{
    parse_document, parse_lookup_response, validate_lookup, InvalidReason, LookupResult,
    ParseError,
};

use crate::config::Config;
use crate::Result;

/// Runs a single invocation against the configured collaborators
///
/// This is the entry point shared by the CLI and the serverless handler.
/// It wires the production queue, catalog and lookup client, then drains
/// the queue according to the configured drain mode.
///
/// # Returns
///
/// * `Ok(RunReport)` - The invocation completed
/// * `Err(CrawlError)` - A fatal error aborted the invocation
pub async fn run_invocation(config: &Config) -> Result<RunReport> {
    Coordinator::from_config(config).await?.run().await
}
