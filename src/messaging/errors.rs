//! # Messaging Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MessagingError {
    /// Broker unreachable, connection reset, consumer session lost
    #[error("Broker transport error: {message}")]
    Transport { message: String },

    #[error("Publish to topic {topic} failed: {message}")]
    Publish { topic: String, message: String },

    #[error("Offset commit failed for {topic}[{partition}]@{offset}: {message}")]
    Commit {
        topic: String,
        partition: i32,
        offset: i64,
        message: String,
    },

    #[error("Publish to topic {topic} timed out after {timeout_ms}ms")]
    Timeout { topic: String, timeout_ms: u64 },

    #[error("Message serialization error: {message}")]
    Serialization { message: String },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },
}

impl MessagingError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl MessagingError {
    /// Whether repeating the same broker call can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Publish { .. } | Self::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_side_failures_are_retryable() {
        assert!(MessagingError::transport("connection reset").is_retryable());
        assert!(MessagingError::publish("dlq", "queue full").is_retryable());
        assert!(MessagingError::Timeout {
            topic: "dlq".into(),
            timeout_ms: 5000
        }
        .is_retryable());
    }

    #[test]
    fn test_local_failures_are_not_retryable() {
        assert!(!MessagingError::serialization("bad record").is_retryable());
        assert!(!MessagingError::configuration("kafka_producer", "bad").is_retryable());
    }
}
