//! Request signing for the lookup API
//!
//! The lookup API authenticates every call with a signature computed over the
//! exact query string that is sent. This module provides:
//! - The `Signer` seam the fetcher signs through
//! - Canonical (sorted, percent-encoded) query serialization
//! - A signing clock that never goes backwards
//! - The default HMAC-SHA256 signer

mod clock;
mod hmac_signer;

pub use clock::SigningClock;
pub use hmac_signer::HmacSha256Signer;

use std::collections::BTreeMap;

/// The request components a signature covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    /// Parameters already serialized by [`canonical_query`]
    pub canonical_query: &'a str,
}

/// Produces a signature for a lookup request
///
/// Implementations own the secret; callers only hand over the request shape.
pub trait Signer: Send + Sync {
    fn sign(&self, request: &SigningRequest<'_>) -> String;
}

/// Serializes parameters in strict ascending key order
///
/// Keys and values are percent-encoded per RFC 3986 (everything except
/// `A-Z a-z 0-9 - _ . ~`). The signature is computed over this exact string,
/// so the order here and the order on the wire must match.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use asin_ripple::signing::canonical_query;
///
/// let mut params = BTreeMap::new();
/// params.insert("ItemId".to_string(), "B000123".to_string());
/// params.insert("AWSAccessKeyId".to_string(), "AKIA".to_string());
/// assert_eq!(canonical_query(&params), "AWSAccessKeyId=AKIA&ItemId=B000123");
/// ```
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
