//! Queue module for the lookup work queue
//!
//! This module contains:
//! - `QueueTransport`, the narrow receive/delete/send seam over the transport
//! - `QueueClient`, which adds best-effort acknowledgement and dedup-aware sends
//! - The SQS-backed transport

mod client;
mod sqs;

pub use client::QueueClient;
pub use sqs::SqsTransport;

use crate::storage::StorageError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by the queue transport or the dedup check in front of it
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to receive messages: {0}")]
    Receive(String),

    #[error("Failed to delete message: {0}")]
    Delete(String),

    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("Catalog check failed: {0}")]
    DedupCheck(#[from] StorageError),
}

/// A message received from the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// The catalog identifier carried in the message body
    pub identifier: String,

    /// Opaque handle required to acknowledge the message
    pub delivery_handle: String,
}

impl QueueMessage {
    pub fn new(identifier: impl Into<String>, delivery_handle: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            delivery_handle: delivery_handle.into(),
        }
    }

    /// True when the body carries no identifier to look up
    pub fn is_blank(&self) -> bool {
        self.identifier.trim().is_empty()
    }
}

/// Transport-level queue operations
///
/// Delivery is at-least-once: a received message that is not deleted
/// becomes visible again once its visibility timeout lapses.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Receives up to `max_messages`, waiting up to `wait_seconds` for any to arrive
    ///
    /// Returns an empty vector when the queue has nothing to deliver.
    async fn receive(
        &self,
        max_messages: u32,
        wait_seconds: u32,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledges a message by its delivery handle
    async fn delete(&self, delivery_handle: &str) -> Result<(), QueueError>;

    /// Enqueues an identifier
    async fn send(&self, body: &str) -> Result<(), QueueError>;
}
