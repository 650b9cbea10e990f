//! # Ingress Service
//!
//! Everything the gateway does per request, independent of HTTP: validate a
//! submission, publish it keyed by submitter, or record a forwarding endpoint.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::messaging::{EventPublisher, MessagingError, PublishReceipt};
use crate::models::{CacheEvent, EventEnvelope, EventValidationError, ForwardingEndpoint};
use crate::registry::{EndpointRegistry, RegistryError};

/// `POST /v1/events` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitEventRequest {
    pub user_id: String,
    pub resource_id: String,
    pub action: String,
    pub hit: bool,
    /// RFC 3339 with an explicit offset
    pub timestamp: String,
}

/// `POST /v1/registrations` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEndpointRequest {
    pub user_id: String,
    pub redis_host: String,
    pub redis_port: u16,
    #[serde(default)]
    pub redis_password: String,
}

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to publish event: {0}")]
    Publish(#[from] MessagingError),

    #[error("Failed to store registration: {0}")]
    Registry(#[from] RegistryError),
}

impl From<EventValidationError> for IngressError {
    fn from(error: EventValidationError) -> Self {
        Self::Validation(error.to_string())
    }
}

impl SubmitEventRequest {
    /// Validate and convert into the broker envelope
    pub fn into_envelope(self) -> Result<EventEnvelope, IngressError> {
        if self.user_id.trim().is_empty() {
            return Err(EventValidationError::EmptySubmitterId.into());
        }

        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| {
                IngressError::Validation(format!(
                    "timestamp '{}' is not RFC 3339 with an offset: {e}",
                    self.timestamp
                ))
            })?
            .with_timezone(&Utc);

        let event = CacheEvent::new(self.resource_id, self.action, self.hit, timestamp);
        event.validate()?;

        Ok(EventEnvelope::new(Some(self.user_id), event))
    }
}

impl RegisterEndpointRequest {
    pub fn into_endpoint(self) -> Result<ForwardingEndpoint, IngressError> {
        if self.user_id.trim().is_empty() {
            return Err(EventValidationError::EmptySubmitterId.into());
        }
        if self.redis_host.trim().is_empty() {
            return Err(IngressError::Validation(
                "redis_host must not be empty".to_string(),
            ));
        }
        Ok(ForwardingEndpoint {
            submitter_id: self.user_id,
            host: self.redis_host,
            port: self.redis_port,
            credential: self.redis_password,
        })
    }
}

pub struct IngressService {
    publisher: Arc<dyn EventPublisher>,
    registry: Arc<dyn EndpointRegistry>,
    topic: String,
}

impl std::fmt::Debug for IngressService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngressService")
            .field("publisher", &self.publisher.provider_name())
            .field("registry", &self.registry.provider_name())
            .field("topic", &self.topic)
            .finish()
    }
}

impl IngressService {
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        registry: Arc<dyn EndpointRegistry>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            registry,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish one event keyed by its submitter. No retry: the caller resubmits.
    pub async fn submit_event(
        &self,
        request: SubmitEventRequest,
    ) -> Result<PublishReceipt, IngressError> {
        let envelope = request.into_envelope()?;
        let submitter_id = envelope.submitter_id.clone().unwrap_or_default();
        let payload = envelope.to_bytes().map_err(MessagingError::from)?;

        let receipt = self
            .publisher
            .publish(&self.topic, &submitter_id, &payload)
            .await
            .inspect_err(|e| {
                error!(
                    topic = %self.topic,
                    user_id = %submitter_id,
                    error = %e,
                    "Event publish failed"
                );
            })?;

        debug!(
            topic = %self.topic,
            user_id = %submitter_id,
            resource_id = %envelope.event.resource_id,
            partition = receipt.partition,
            offset = receipt.offset,
            "Event published"
        );
        Ok(receipt)
    }

    pub async fn register_endpoint(
        &self,
        request: RegisterEndpointRequest,
    ) -> Result<ForwardingEndpoint, IngressError> {
        let endpoint = request.into_endpoint()?;
        self.registry.register(&endpoint).await.inspect_err(|e| {
            error!(user_id = %endpoint.submitter_id, error = %e, "Endpoint registration failed");
        })?;

        debug!(
            user_id = %endpoint.submitter_id,
            host = %endpoint.host,
            port = endpoint.port,
            "Forwarding endpoint registered"
        );
        Ok(endpoint)
    }
}
