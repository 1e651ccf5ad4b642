//! SQS queue transport

use crate::config::QueueConfig;
use crate::queue::{QueueError, QueueMessage, QueueTransport};
use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;

/// Queue transport backed by an SQS queue
#[derive(Clone)]
pub struct SqsTransport {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsTransport {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Builds a transport from the ambient AWS configuration
    ///
    /// Credentials and region come from the default provider chain; the
    /// configured region, if any, takes precedence.
    pub async fn from_config(config: &QueueConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        Self::new(aws_sdk_sqs::Client::new(&sdk_config), config.url.clone())
    }
}

/// Converts a received message, keeping malformed ones in the batch
///
/// A missing or blank body becomes a blank identifier; the coordinator
/// acknowledges it without a lookup.
fn to_queue_message(body: Option<&str>, receipt_handle: Option<&str>) -> QueueMessage {
    let body = body.unwrap_or_default().trim();
    if body.is_empty() {
        tracing::warn!("Received a queue message with an empty body");
    }
    QueueMessage::new(body, receipt_handle.unwrap_or_default())
}

#[async_trait]
impl QueueTransport for SqsTransport {
    async fn receive(
        &self,
        max_messages: u32,
        wait_seconds: u32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages as i32)
            .wait_time_seconds(wait_seconds as i32)
            .send()
            .await
            .map_err(|error| QueueError::Receive(DisplayErrorContext(&error).to_string()))?;

        // A response without a Messages field means the queue is drained.
        let messages = output
            .messages()
            .iter()
            .map(|message| to_queue_message(message.body(), message.receipt_handle()))
            .collect();

        Ok(messages)
    }

    async fn delete(&self, delivery_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(delivery_handle)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| QueueError::Delete(DisplayErrorContext(&error).to_string()))
    }

    async fn send(&self, body: &str) -> Result<(), QueueError> {
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| QueueError::Send(DisplayErrorContext(&error).to_string()))
    }
}
