//! Per-item pipeline outcomes
//!
//! Every stage of the pipeline reports through `ItemOutcome` so the
//! orchestrator can tell a retriable soft failure from a hard one without
//! overloading a boolean.
use crate::crawler::{ExpansionReport, InvalidReason};
use crate::storage::CatalogProduct;
use std::fmt;

/// A fully processed item
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedItem {
    pub product: CatalogProduct,
    pub expansion: ExpansionReport,
}

/// Why an item was left in the queue for natural redelivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The lookup response was malformed or flagged invalid
    InvalidResponse(InvalidReason),

    /// The importer had nothing to upsert
    ImportNoOp,
}

/// Hard per-item failures; the message is also left undeleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The lookup API could not be reached or answered with an HTTP error
    Fetch(String),

    /// The catalog store rejected the upsert
    Persistence(String),
}

/// Result of running one message through fetch, import and expansion
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Success(ProcessedItem),
    Retry(RetryReason),
    Failure(FailureKind),
}

impl ItemOutcome {
    /// Only successful items may have their message deleted
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidResponse(reason) => write!(f, "invalid response: {}", reason),
            Self::ImportNoOp => write!(f, "import produced no product"),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(message) => write!(f, "fetch failed: {}", message),
            Self::Persistence(message) => write!(f, "persistence failed: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_success_is_success() {
        let retry = ItemOutcome::Retry(RetryReason::ImportNoOp);
        let failure = ItemOutcome::Failure(FailureKind::Fetch("timeout".to_string()));
        assert!(!retry.is_success());
        assert!(!failure.is_success());

        let success = ItemOutcome::Success(ProcessedItem {
            product: CatalogProduct::bare("B000123"),
            expansion: ExpansionReport::default(),
        });
        assert!(success.is_success());
    }

    #[test]
    fn test_reason_display() {
        let reason = RetryReason::InvalidResponse(InvalidReason::NotValid("False".to_string()));
        assert!(reason.to_string().contains("False"));
    }
}
