//! # Event Processor
//!
//! Turns one consumed message into one durable outcome: a stored row or a
//! dead-letter record. Only then is the message marked handled, which may move
//! the partition's committed offset.
//!
//! A message that can be neither stored nor dead-lettered pins its partition's
//! commit point, so the processor starts the drain: the relay exits and the
//! next group member receives the message again.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::dead_letter::{DeadLetterDisposition, DeadLetterQueue, DeadLetterReason, DeadLetterRecord};
use super::offsets::OffsetTracker;
use super::retry::{with_retry, RetryError, RetryPolicy};
use super::shutdown::ShutdownCoordinator;
use crate::messaging::{BrokerMessage, EventConsumer, MessagePosition};
use crate::models::EventEnvelope;
use crate::storage::{EventSink, InsertOutcome};

/// Result of handling one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Persisted(InsertOutcome),
    DeadLettered(DeadLetterReason),
    /// Unprocessable and dead-lettering is disabled
    Discarded(DeadLetterReason),
    /// Could not be persisted nor dead-lettered; left uncommitted for redelivery
    Stranded(DeadLetterReason),
}

impl ProcessOutcome {
    /// Whether the message may count towards the committed offset
    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::Stranded(_))
    }
}

/// One unit of work executed by a pool worker
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, message: BrokerMessage) -> ProcessOutcome;
}

pub struct EventProcessor {
    sink: Arc<dyn EventSink>,
    consumer: Arc<dyn EventConsumer>,
    dead_letters: DeadLetterQueue,
    offsets: Arc<OffsetTracker>,
    retry: RetryPolicy,
    shutdown: Arc<ShutdownCoordinator>,
    /// Held across `complete` and `commit` so commits reach the broker in the
    /// order the tracker issued them
    commit_order: Mutex<()>,
}

impl std::fmt::Debug for EventProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventProcessor")
            .field("sink", &self.sink.provider_name())
            .field("consumer", &self.consumer.provider_name())
            .field("dead_letters", &self.dead_letters)
            .field("retry", &self.retry)
            .finish()
    }
}

impl EventProcessor {
    pub fn new(
        sink: Arc<dyn EventSink>,
        consumer: Arc<dyn EventConsumer>,
        dead_letters: DeadLetterQueue,
        offsets: Arc<OffsetTracker>,
        retry: RetryPolicy,
        shutdown: Arc<ShutdownCoordinator>,
    ) -> Self {
        Self {
            sink,
            consumer,
            dead_letters,
            offsets,
            retry,
            shutdown,
            commit_order: Mutex::new(()),
        }
    }

    async fn process(&self, message: &BrokerMessage) -> ProcessOutcome {
        let envelope = match EventEnvelope::from_bytes(message.payload_bytes()) {
            Ok(envelope) => envelope,
            Err(e) => {
                return self
                    .dead_letter(message, DeadLetterReason::MalformedPayload, e.to_string(), 0)
                    .await
            }
        };

        if let Err(e) = envelope.event.validate() {
            return self
                .dead_letter(message, DeadLetterReason::InvalidEvent, e.to_string(), 0)
                .await;
        }

        let event = &envelope.event;
        match with_retry(&self.retry, || self.sink.insert(event)).await {
            Ok(outcome) => {
                debug!(
                    position = %message.position,
                    resource_id = %event.resource_id,
                    outcome = ?outcome,
                    "Event persisted"
                );
                ProcessOutcome::Persisted(outcome)
            }
            Err(RetryError {
                error,
                attempts,
                exhausted,
            }) => {
                let reason = if exhausted {
                    DeadLetterReason::RetriesExhausted
                } else {
                    DeadLetterReason::StorageRejected
                };
                self.dead_letter(message, reason, error.to_string(), attempts)
                    .await
            }
        }
    }

    async fn dead_letter(
        &self,
        message: &BrokerMessage,
        reason: DeadLetterReason,
        error: String,
        attempts: u32,
    ) -> ProcessOutcome {
        let record = DeadLetterRecord::new(message, reason, error, attempts);
        match with_retry(&self.retry, || self.dead_letters.park(record.clone())).await {
            Ok(DeadLetterDisposition::Parked) => ProcessOutcome::DeadLettered(reason),
            Ok(DeadLetterDisposition::Discarded) => ProcessOutcome::Discarded(reason),
            Err(RetryError {
                error,
                attempts: publish_attempts,
                ..
            }) => {
                error!(
                    position = %message.position,
                    reason = %reason,
                    error = %error,
                    attempts = publish_attempts,
                    "Dead-letter publish failed; message left uncommitted, draining relay"
                );
                self.shutdown.begin_drain();
                ProcessOutcome::Stranded(reason)
            }
        }
    }

    async fn mark_handled(&self, position: &MessagePosition) {
        let _ordered = self.commit_order.lock().await;
        let Some(commit) = self.offsets.complete(position) else {
            return;
        };
        // a lost commit only widens the redelivery window
        if let Err(e) = self.consumer.commit(&commit).await {
            warn!(position = %commit, error = %e, "Offset commit failed");
        } else {
            debug!(position = %commit, "Offset committed");
        }
    }
}

#[async_trait]
impl MessageHandler for EventProcessor {
    async fn handle(&self, message: BrokerMessage) -> ProcessOutcome {
        let outcome = self.process(&message).await;
        if outcome.is_handled() {
            self.mark_handled(&message.position).await;
        }
        outcome
    }
}
