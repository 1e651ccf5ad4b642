use crate::queue::{QueueError, QueueMessage, QueueTransport};
use crate::state::SeenSet;
use crate::storage::CatalogStore;
use std::sync::Arc;

/// Queue operations used by the pipeline
///
/// Wraps a transport with the catalog store so that sends can be skipped for
/// identifiers that are already known.
#[derive(Clone)]
pub struct QueueClient {
    transport: Arc<dyn QueueTransport>,
    catalog: Arc<dyn CatalogStore>,
}

impl QueueClient {
    pub fn new(transport: Arc<dyn QueueTransport>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { transport, catalog }
    }

    /// Requests a batch of messages; an empty batch means no more work
    pub async fn receive(
        &self,
        max_messages: u32,
        wait_seconds: u32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        tracing::debug!(
            "Polling queue (max {} messages, wait {}s)",
            max_messages,
            wait_seconds
        );
        let messages = self.transport.receive(max_messages, wait_seconds).await?;
        tracing::debug!("Received {} messages", messages.len());
        Ok(messages)
    }

    /// Acknowledges a message
    ///
    /// Best effort: a failure is logged and reported as `false`, never
    /// escalated. The message simply becomes visible again later.
    pub async fn delete(&self, message: &QueueMessage) -> bool {
        match self.transport.delete(&message.delivery_handle).await {
            Ok(()) => {
                tracing::debug!("Deleted message for {}", message.identifier);
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to delete message for {}: {}",
                    message.identifier,
                    e
                );
                false
            }
        }
    }

    /// Enqueues `identifier` unless it is already known
    ///
    /// An identifier is known if it was claimed in `seen` during this
    /// invocation or is present in the catalog. The seen-set is checked
    /// first, then the catalog, and the identifier is claimed before the send
    /// so concurrent callers cannot both send it.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The identifier was enqueued
    /// * `Ok(false)` - Skipped because it is already known
    /// * `Err(QueueError)` - The catalog check or the send failed
    pub async fn send_if_absent(
        &self,
        identifier: &str,
        seen: &SeenSet,
    ) -> Result<bool, QueueError> {
        if seen.contains(identifier) {
            tracing::trace!("{} already queued this invocation", identifier);
            return Ok(false);
        }

        if self.catalog.count_by_identifier(identifier).await? > 0 {
            tracing::trace!("{} already in catalog", identifier);
            return Ok(false);
        }

        if !seen.insert(identifier) {
            return Ok(false);
        }

        self.transport.send(identifier).await?;
        tracing::debug!("Enqueued {}", identifier);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LookupRecord, SqliteCatalog};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
        fail_deletes: bool,
    }

    #[async_trait]
    impl QueueTransport for RecordingTransport {
        async fn receive(&self, _: u32, _: u32) -> Result<Vec<QueueMessage>, QueueError> {
            Ok(Vec::new())
        }

        async fn delete(&self, _: &str) -> Result<(), QueueError> {
            if self.fail_deletes {
                Err(QueueError::Delete("receipt handle expired".to_string()))
            } else {
                Ok(())
            }
        }

        async fn send(&self, body: &str) -> Result<(), QueueError> {
            self.sent.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    async fn client_with_known(known: &[&str]) -> (QueueClient, Arc<RecordingTransport>) {
        let catalog = Arc::new(SqliteCatalog::new_in_memory().unwrap());
        for id in known {
            catalog
                .upsert_from_record(&LookupRecord::new(json!({ "ASIN": id })))
                .await
                .unwrap();
        }
        let transport = Arc::new(RecordingTransport::default());
        (QueueClient::new(transport.clone(), catalog), transport)
    }

    #[tokio::test]
    async fn test_send_if_absent_sends_new_identifier() {
        let (client, transport) = client_with_known(&[]).await;
        let seen = SeenSet::new();

        assert!(client.send_if_absent("B000200", &seen).await.unwrap());
        assert!(seen.contains("B000200"));
        assert_eq!(*transport.sent.lock().unwrap(), vec!["B000200"]);
    }

    #[tokio::test]
    async fn test_send_if_absent_skips_catalog_identifier() {
        let (client, transport) = client_with_known(&["B000123"]).await;
        let seen = SeenSet::new();

        assert!(!client.send_if_absent("B000123", &seen).await.unwrap());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_if_absent_skips_seen_identifier() {
        let (client, transport) = client_with_known(&[]).await;
        let seen = SeenSet::new();
        seen.insert("B000200");

        assert!(!client.send_if_absent("B000200", &seen).await.unwrap());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_if_absent_sends_once_per_invocation() {
        let (client, transport) = client_with_known(&[]).await;
        let seen = SeenSet::new();

        assert!(client.send_if_absent("B000200", &seen).await.unwrap());
        assert!(!client.send_if_absent("B000200", &seen).await.unwrap());
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_failure_is_not_escalated() {
        let catalog = Arc::new(SqliteCatalog::new_in_memory().unwrap());
        let transport = Arc::new(RecordingTransport {
            fail_deletes: true,
            ..Default::default()
        });
        let client = QueueClient::new(transport, catalog);

        let acknowledged = client.delete(&QueueMessage::new("B000123", "handle-1")).await;
        assert!(!acknowledged);
    }
}
