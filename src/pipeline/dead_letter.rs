//! # Dead-Letter Topic
//!
//! Messages the relay cannot persist are republished, with the failure reason
//! and their original coordinates, to a separate topic under the original key.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::config::DeadLetterConfig;
use crate::messaging::{BrokerMessage, EventPublisher, MessagingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterReason {
    /// Payload is not a JSON event envelope
    MalformedPayload,
    /// Decoded, but fails event validation
    InvalidEvent,
    /// Storage rejected the row permanently
    StorageRejected,
    /// Every storage attempt failed with a transient error
    RetriesExhausted,
}

impl fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MalformedPayload => "malformed_payload",
            Self::InvalidEvent => "invalid_event",
            Self::StorageRejected => "storage_rejected",
            Self::RetriesExhausted => "retries_exhausted",
        };
        f.write_str(name)
    }
}

/// Original payload: text when it was valid UTF-8, raw bytes otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeadLetterPayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl DeadLetterPayload {
    fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::Text(text.to_string()),
            Err(_) => Self::Bytes(bytes.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    pub reason: DeadLetterReason,
    pub error: String,
    /// Storage attempts made; 0 when the message never reached storage
    pub attempts: u32,
    pub source_topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: DeadLetterPayload,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetterRecord {
    pub fn new(
        message: &BrokerMessage,
        reason: DeadLetterReason,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            reason,
            error: error.into(),
            attempts,
            source_topic: message.position.topic.clone(),
            partition: message.position.partition,
            offset: message.position.offset,
            key: message.key_str(),
            payload: DeadLetterPayload::from_bytes(message.payload_bytes()),
            failed_at: Utc::now(),
        }
    }
}

/// What happened to a failed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterDisposition {
    Parked,
    /// Dead-lettering is disabled; the failure was only logged
    Discarded,
}

#[derive(Clone)]
pub struct DeadLetterQueue {
    publisher: Arc<dyn EventPublisher>,
    topic: String,
    enabled: bool,
}

impl fmt::Debug for DeadLetterQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadLetterQueue")
            .field("publisher", &self.publisher.provider_name())
            .field("topic", &self.topic)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl DeadLetterQueue {
    pub fn new(publisher: Arc<dyn EventPublisher>, config: &DeadLetterConfig) -> Self {
        Self {
            publisher,
            topic: config.topic.clone(),
            enabled: config.enabled,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish `record` to the dead-letter topic, or log and drop it when disabled.
    ///
    /// An error means the record was not preserved and the source message must
    /// not be treated as handled.
    pub async fn park(
        &self,
        record: DeadLetterRecord,
    ) -> Result<DeadLetterDisposition, MessagingError> {
        if !self.enabled {
            error!(
                reason = %record.reason,
                error = %record.error,
                source_topic = %record.source_topic,
                partition = record.partition,
                offset = record.offset,
                "Discarding unprocessable message (dead-letter topic disabled)"
            );
            return Ok(DeadLetterDisposition::Discarded);
        }

        let payload = serde_json::to_vec(&record)?;
        let key = record.key.clone().unwrap_or_default();
        self.publisher.publish(&self.topic, &key, &payload).await?;

        warn!(
            reason = %record.reason,
            error = %record.error,
            attempts = record.attempts,
            source_topic = %record.source_topic,
            partition = record.partition,
            offset = record.offset,
            dead_letter_topic = %self.topic,
            "Message parked on dead-letter topic"
        );
        Ok(DeadLetterDisposition::Parked)
    }
}
