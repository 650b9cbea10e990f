//! Cache access events and their broker envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One cache access, the unit of record persisted by the relay.
///
/// `(resource_id, timestamp)` is the storage identity: two events sharing it
/// collapse into one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEvent {
    pub resource_id: String,
    /// Free-form operation tag (`read`, `write`, `evict`, `GET`, ...)
    pub action: String,
    pub hit: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventValidationError {
    #[error("resource_id must not be empty")]
    EmptyResourceId,
    #[error("user_id must not be empty")]
    EmptySubmitterId,
}

impl CacheEvent {
    pub fn new(
        resource_id: impl Into<String>,
        action: impl Into<String>,
        hit: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            action: action.into(),
            hit,
            timestamp,
        }
    }

    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.resource_id.trim().is_empty() {
            return Err(EventValidationError::EmptyResourceId);
        }
        Ok(())
    }
}

/// Broker payload: the event plus the identity of whoever submitted it.
///
/// `user_id` is optional on decode because the client library publishes
/// events without going through the gateway. It is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub submitter_id: Option<String>,
    #[serde(flatten)]
    pub event: CacheEvent,
}

impl EventEnvelope {
    pub fn new(submitter_id: Option<String>, event: CacheEvent) -> Self {
        Self {
            submitter_id,
            event,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_envelope_wire_shape() {
        let envelope = EventEnvelope::new(
            Some("u1".to_string()),
            CacheEvent::new("r42", "read", true, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        );
        let json: serde_json::Value = serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "user_id": "u1",
                "resource_id": "r42",
                "action": "read",
                "hit": true,
                "timestamp": "2024-01-01T00:00:00Z"
            })
        );
    }

    #[test]
    fn test_decode_without_submitter() {
        let payload = br#"{"resource_id":"resource:3","action":"GET","hit":false,"timestamp":"2024-05-01T12:30:00.125Z"}"#;
        let envelope = EventEnvelope::from_bytes(payload).unwrap();
        assert_eq!(envelope.submitter_id, None);
        assert_eq!(envelope.event.resource_id, "resource:3");
        assert_eq!(envelope.event.timestamp.timestamp_subsec_millis(), 125);
    }

    #[test]
    fn test_offset_timestamps_normalize_to_utc() {
        let payload = br#"{"resource_id":"r","action":"evict","hit":false,"timestamp":"2024-01-01T02:00:00+02:00"}"#;
        let envelope = EventEnvelope::from_bytes(payload).unwrap();
        assert_eq!(
            envelope.event.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        assert!(EventEnvelope::from_bytes(b"not json").is_err());
        assert!(EventEnvelope::from_bytes(br#"{"resource_id":"r","action":"x","hit":"yes","timestamp":"2024-01-01T00:00:00Z"}"#).is_err());
        assert!(EventEnvelope::from_bytes(br#"{"resource_id":"r","action":"x","hit":true,"timestamp":"yesterday"}"#).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_resource() {
        let event = CacheEvent::new("  ", "read", true, Utc::now());
        assert_eq!(event.validate(), Err(EventValidationError::EmptyResourceId));
    }
}
