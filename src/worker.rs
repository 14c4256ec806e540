//! The at-least-once queue consumer.
//!
//! One worker owns one inbound queue. Each iteration long-polls for a batch,
//! validates every message, persists the valid ones, forwards the invalid
//! ones to the sink queue, and deletes each handled message from the inbound
//! queue so genuinely malformed input cannot loop forever.
//!
//! Shutdown is cooperative: the cancellation token is consulted before each
//! receive and after each message within a batch, so an in-flight message is
//! always finished (including its delete) while the rest of the batch is
//! left for natural redelivery once the visibility timeout lapses.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::db::{self, InsertOutcome};
use crate::model::SubmissionKind;
use crate::queue::{QueueClient, ReceivedMessage};
use crate::validate;

/// Receive-call parameters, taken from `app.*` config.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub wait_time_seconds: i32,
    pub max_messages: i32,
}

pub struct Worker {
    kind: SubmissionKind,
    pool: SqlitePool,
    inbound: Arc<dyn QueueClient>,
    invalid: Arc<dyn QueueClient>,
    settings: WorkerSettings,
}

impl Worker {
    pub fn new(
        kind: SubmissionKind,
        pool: SqlitePool,
        inbound: Arc<dyn QueueClient>,
        invalid: Arc<dyn QueueClient>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            kind,
            pool,
            inbound,
            invalid,
            settings,
        }
    }

    /// Consume until cancelled. Returns `Err` only on failures that should
    /// take the process down (the supervisor restarts it); duplicates and
    /// invalid messages are handled in-line.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        info!(kind = %self.kind, queue = self.inbound.name(), "worker started");

        loop {
            if token.is_cancelled() {
                break;
            }

            // A batch that completes in the same instant as the cancel is
            // still drained one message deep, so list the receive first.
            let batch = tokio::select! {
                biased;
                res = self
                    .inbound
                    .receive(self.settings.wait_time_seconds, self.settings.max_messages) =>
                {
                    res.with_context(|| format!("receive failed on {}", self.inbound.name()))?
                }
                _ = token.cancelled() => break,
            };

            for message in &batch {
                self.process(message).await?;
                if token.is_cancelled() {
                    // Remaining messages stay invisible until the visibility
                    // timeout expires, then get redelivered.
                    info!(kind = %self.kind, "shutdown requested mid-batch; draining stopped");
                    break;
                }
            }
        }

        info!(kind = %self.kind, queue = self.inbound.name(), "worker stopped");
        Ok(())
    }

    /// Handle a single delivery: persist or reject, then delete.
    ///
    /// Persistence happens before the delete. A non-duplicate database error
    /// propagates without deleting, so the message is redelivered after the
    /// visibility timeout; the uniqueness constraint absorbs the duplicate
    /// insert on the retry.
    #[instrument(skip_all, fields(kind = self.kind.as_str(), message_id = %message.message_id))]
    pub async fn process(&self, message: &ReceivedMessage) -> Result<()> {
        match validate::extract_payload(self.kind, &message.body) {
            Some(payload) => {
                let outcome =
                    db::insert_submission(&self.pool, self.kind, &message.message_id, &payload)
                        .await?;
                match outcome {
                    InsertOutcome::Inserted(id) => {
                        info!(submission_id = id, "submission persisted");
                    }
                    InsertOutcome::Duplicate => {
                        warn!("duplicate delivery ignored");
                    }
                }
            }
            None => {
                warn!(
                    sink = self.invalid.name(),
                    "invalid message; forwarding to sink"
                );
                self.invalid
                    .send(&message.body)
                    .await
                    .with_context(|| format!("forward to {} failed", self.invalid.name()))?;
            }
        }

        self.inbound
            .delete(&message.receipt_handle)
            .await
            .with_context(|| format!("delete on {} failed", self.inbound.name()))?;
        Ok(())
    }
}
