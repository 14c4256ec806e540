//! Queue client abstraction and its SQS implementation.
//!
//! The worker and the intake API only see the [`QueueClient`] trait, so tests
//! can substitute an in-memory queue. [`SqsQueue`] is the single production
//! implementation, parameterized by queue name — one type serves the inbound
//! and invalid-sink queues of every submission kind.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_sdk_sqs::Client as SqsClient;
use chrono::Utc;
use std::fmt;
use tracing::{debug, info};

/// A message pulled off a queue, pending deletion.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Queue-assigned id, unique within the retention window. Used as the
    /// idempotency key when persisting.
    pub message_id: String,
    /// Handle required to delete this delivery.
    pub receipt_handle: String,
    pub body: String,
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Enqueue a payload. Fire-and-forget: success means the queue API
    /// acknowledged the send, nothing more.
    async fn send(&self, body: &str) -> Result<()>;

    /// Long-poll for up to `max_messages`, blocking up to
    /// `wait_time_seconds`. An empty vec on timeout is not an error.
    async fn receive(
        &self,
        wait_time_seconds: i32,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>>;

    /// Delete a processed delivery so it is not redelivered.
    async fn delete(&self, receipt_handle: &str) -> Result<()>;

    fn name(&self) -> &str;
}

/// SQS-backed queue handle.
#[derive(Clone)]
pub struct SqsQueue {
    client: SqsClient,
    name: String,
    url: String,
}

impl fmt::Debug for SqsQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqsQueue")
            .field("name", &self.name)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl SqsQueue {
    /// Resolve a queue by name, creating it if it does not exist yet. Any
    /// other lookup failure is fatal — the caller should crash and let the
    /// supervisor restart it.
    pub async fn resolve(client: SqsClient, name: &str) -> Result<Self> {
        let url = match client.get_queue_url().queue_name(name).send().await {
            Ok(out) => out
                .queue_url()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("queue {} resolved without a URL", name))?,
            Err(err) => {
                let service_err = err.into_service_error();
                if !service_err.is_queue_does_not_exist() {
                    return Err(anyhow!("failed to resolve queue {}: {}", name, service_err));
                }
                info!(queue = name, "queue does not exist; creating");
                let created = client
                    .create_queue()
                    .queue_name(name)
                    .send()
                    .await
                    .with_context(|| format!("failed to create queue {}", name))?;
                created
                    .queue_url()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("queue {} created without a URL", name))?
            }
        };

        Ok(Self {
            client,
            name: name.to_string(),
            url,
        })
    }
}

#[async_trait]
impl QueueClient for SqsQueue {
    async fn send(&self, body: &str) -> Result<()> {
        let sent_at = MessageAttributeValue::builder()
            .data_type("Number")
            .string_value(Utc::now().timestamp().to_string())
            .build()
            .context("failed to build sent_at attribute")?;

        let out = self
            .client
            .send_message()
            .queue_url(&self.url)
            .message_body(body)
            .message_attributes("sent_at", sent_at)
            .send()
            .await
            .with_context(|| format!("failed to send to queue {}", self.name))?;

        debug!(
            queue = %self.name,
            message_id = out.message_id().unwrap_or_default(),
            "message enqueued"
        );
        Ok(())
    }

    async fn receive(
        &self,
        wait_time_seconds: i32,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>> {
        let out = self
            .client
            .receive_message()
            .queue_url(&self.url)
            .wait_time_seconds(wait_time_seconds)
            .max_number_of_messages(max_messages)
            .send()
            .await
            .with_context(|| format!("failed to receive from queue {}", self.name))?;

        // Skip anything without the fields we need; SQS should not produce
        // such messages but the accessors are all optional.
        let messages = out
            .messages()
            .iter()
            .filter_map(|msg| {
                Some(ReceivedMessage {
                    message_id: msg.message_id()?.to_string(),
                    receipt_handle: msg.receipt_handle()?.to_string(),
                    body: msg.body()?.to_string(),
                })
            })
            .collect();
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .with_context(|| format!("failed to delete from queue {}", self.name))?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build an SQS client from the service configuration. The endpoint override
/// is for localstack-style setups.
pub async fn sqs_client(cfg: &crate::config::Aws) -> SqsClient {
    let region = aws_config::Region::new(cfg.region.clone());
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);
    if let Some(endpoint) = &cfg.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;
    SqsClient::new(&sdk_config)
}
