//! Provider-agnostic message types.

use chrono::{DateTime, Utc};
use std::fmt;

/// Where a consumed message lives: the unit of offset tracking and commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessagePosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl fmt::Display for MessagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}

/// An owned message read under the consumer group
#[derive(Debug, Clone)]
pub struct BrokerMessage {
    pub position: MessagePosition,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub received_at: DateTime<Utc>,
}

impl BrokerMessage {
    pub fn new(
        position: MessagePosition,
        key: Option<Vec<u8>>,
        payload: Option<Vec<u8>>,
    ) -> Self {
        Self {
            position,
            key,
            payload,
            received_at: Utc::now(),
        }
    }

    pub fn key_str(&self) -> Option<String> {
        self.key
            .as_deref()
            .map(|k| String::from_utf8_lossy(k).into_owned())
    }

    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or_default()
    }
}

/// Where the broker placed a published message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    pub partition: i32,
    pub offset: i64,
}
