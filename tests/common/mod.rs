//! In-memory stand-in for the SQS-backed queue client.
//!
//! Messages stay in the store until deleted, so a second `receive` sees the
//! same undeleted messages again — the same redelivery behavior a real queue
//! shows once the visibility timeout lapses.

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use directory_ingest::queue::{QueueClient, ReceivedMessage};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    receipt_handle: String,
    body: String,
    deleted: bool,
}

#[derive(Default)]
pub struct FakeQueue {
    name: String,
    messages: Mutex<Vec<StoredMessage>>,
    /// Bodies pushed through `send`, in order.
    sent: Mutex<Vec<String>>,
    /// Receipt handles passed to `delete`, in order (including repeats).
    deletes: Mutex<Vec<String>>,
    /// When set, cancelled right before `receive` returns a non-empty batch.
    cancel_on_receive: Mutex<Option<CancellationToken>>,
}

impl FakeQueue {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Seed an inbound message, returning its queue-assigned id.
    pub async fn push(&self, body: &str) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.messages.lock().await.push(StoredMessage {
            message_id: message_id.clone(),
            receipt_handle: Uuid::new_v4().to_string(),
            body: body.to_string(),
            deleted: false,
        });
        message_id
    }

    pub async fn cancel_on_receive(&self, token: CancellationToken) {
        *self.cancel_on_receive.lock().await = Some(token);
    }

    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }

    pub async fn deletes(&self) -> Vec<String> {
        self.deletes.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|m| !m.deleted)
            .count()
    }
}

#[async_trait]
impl QueueClient for FakeQueue {
    async fn send(&self, body: &str) -> Result<()> {
        self.sent.lock().await.push(body.to_string());
        Ok(())
    }

    async fn receive(
        &self,
        _wait_time_seconds: i32,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>> {
        let batch: Vec<ReceivedMessage> = self
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| !m.deleted)
            .take(max_messages as usize)
            .map(|m| ReceivedMessage {
                message_id: m.message_id.clone(),
                receipt_handle: m.receipt_handle.clone(),
                body: m.body.clone(),
            })
            .collect();

        if batch.is_empty() {
            // Simulated long poll so a run loop does not spin.
            tokio::time::sleep(Duration::from_millis(20)).await;
            return Ok(Vec::new());
        }

        if let Some(token) = self.cancel_on_receive.lock().await.take() {
            token.cancel();
        }
        Ok(batch)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let mut messages = self.messages.lock().await;
        if let Some(msg) = messages
            .iter_mut()
            .find(|m| m.receipt_handle == receipt_handle)
        {
            msg.deleted = true;
        }
        self.deletes.lock().await.push(receipt_handle.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
