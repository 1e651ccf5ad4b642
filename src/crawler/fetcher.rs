//! Lookup fetcher
//!
//! This module resolves one identifier against the lookup API:
//! - Assembling the request parameters
//! - Signing the canonical query through a `Signer`
//! - Issuing a single GET
//! - Handing the body to the response parser

use crate::config::LookupConfig;
use crate::crawler::parser::{parse_lookup_response, LookupResult};
use crate::signing::{canonical_query, Signer, SigningClock, SigningRequest};
use crate::{CrawlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Resolves an identifier into a lookup result
///
/// `Ok(Invalid(_))` is a soft failure the caller retries through the queue;
/// `Err(_)` means the endpoint could not be reached or answered with an HTTP
/// error.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn fetch(&self, identifier: &str) -> Result<LookupResult>;
}

/// Builds the HTTP client used for lookup calls
///
/// No request timeout is set; the transport defaults apply.
pub fn build_http_client() -> std::result::Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    Client::builder()
        .user_agent(user_agent)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher for the signed lookup API
pub struct Fetcher {
    client: Client,
    endpoint: Url,
    host: String,
    config: LookupConfig,
    signer: Arc<dyn Signer>,
    clock: SigningClock,
}

impl Fetcher {
    /// Creates a fetcher for the configured endpoint
    ///
    /// # Arguments
    ///
    /// * `config` - Lookup endpoint, credentials and fixed request parameters
    /// * `signer` - Signs the canonical query of every request
    pub fn new(config: &LookupConfig, signer: Arc<dyn Signer>) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(CrawlError::Config(crate::ConfigError::InvalidUrl(
                    config.endpoint.clone(),
                )))
            }
        };

        Ok(Self {
            client: build_http_client()?,
            endpoint,
            host,
            config: config.clone(),
            signer,
            clock: SigningClock::new(),
        })
    }

    /// Assembles the request parameters for `identifier`
    ///
    /// Everything except the signature. The map keeps keys in ascending
    /// byte order, which is the order they are signed and sent in.
    pub fn build_params(&self, identifier: &str, timestamp: &str) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("AWSAccessKeyId".to_string(), self.config.access_key.clone());
        params.insert(
            "AssociateTag".to_string(),
            self.config.associate_tag.clone(),
        );
        params.insert("Condition".to_string(), self.config.condition.clone());
        params.insert("IdType".to_string(), self.config.id_type.clone());
        params.insert("ItemId".to_string(), identifier.to_string());
        params.insert("Operation".to_string(), self.config.operation.clone());
        params.insert(
            "ResponseGroup".to_string(),
            self.config.response_group.clone(),
        );
        params.insert("Timestamp".to_string(), timestamp.to_string());
        params
    }

    /// Builds the signed request URL for `identifier`
    pub fn signed_url(&self, identifier: &str) -> String {
        let timestamp = self.clock.timestamp();
        let query = canonical_query(&self.build_params(identifier, &timestamp));

        let signature = self.signer.sign(&SigningRequest {
            method: "GET",
            host: &self.host,
            path: self.endpoint.path(),
            canonical_query: &query,
        });

        // Appended after the canonical string so the signed bytes go out unchanged.
        let mut url = self.endpoint.clone();
        url.set_query(None);
        format!(
            "{}?{}&Signature={}",
            url,
            query,
            urlencoding::encode(&signature)
        )
    }
}

#[async_trait]
impl Lookup for Fetcher {
    async fn fetch(&self, identifier: &str) -> Result<LookupResult> {
        let url = self.signed_url(identifier);
        tracing::debug!("Looking up {}", identifier);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| CrawlError::Fetch {
                identifier: identifier.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::FetchStatus {
                identifier: identifier.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| CrawlError::Fetch {
            identifier: identifier.to_string(),
            source,
        })?;

        let result = parse_lookup_response(&body);
        if let LookupResult::Invalid(reason) = &result {
            tracing::warn!("Lookup for {} rejected: {}", identifier, reason);
        }
        Ok(result)
    }
}
