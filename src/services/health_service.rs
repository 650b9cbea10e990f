//! Gateway readiness: can we publish, and can we register?

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::messaging::EventPublisher;
use crate::registry::EndpointRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub provider: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub components: Vec<ComponentHealth>,
}

impl ReadinessResponse {
    pub fn is_ready(&self) -> bool {
        self.components.iter().all(|c| c.healthy)
    }
}

pub struct HealthService {
    publisher: Arc<dyn EventPublisher>,
    registry: Arc<dyn EndpointRegistry>,
}

impl std::fmt::Debug for HealthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthService")
            .field("publisher", &self.publisher.provider_name())
            .field("registry", &self.registry.provider_name())
            .finish()
    }
}

impl HealthService {
    pub fn new(publisher: Arc<dyn EventPublisher>, registry: Arc<dyn EndpointRegistry>) -> Self {
        Self {
            publisher,
            registry,
        }
    }

    pub fn basic_health(&self) -> BasicHealthResponse {
        BasicHealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Probe both dependencies; `Err` carries the same report when any is down
    pub async fn readiness(&self) -> Result<ReadinessResponse, ReadinessResponse> {
        let (broker, registry) =
            tokio::join!(self.publisher.health_check(), self.registry.health_check());

        let components = vec![
            ComponentHealth {
                name: "broker".to_string(),
                provider: self.publisher.provider_name().to_string(),
                healthy: broker.is_ok(),
                message: broker.err().map(|e| e.to_string()),
            },
            ComponentHealth {
                name: "registry".to_string(),
                provider: self.registry.provider_name().to_string(),
                healthy: registry.is_ok(),
                message: registry.err().map(|e| e.to_string()),
            },
        ];

        let mut response = ReadinessResponse {
            status: "ready".to_string(),
            timestamp: Utc::now(),
            components,
        };
        if response.is_ready() {
            Ok(response)
        } else {
            response.status = "not_ready".to_string();
            Err(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryBroker;
    use crate::registry::InMemoryEndpointRegistry;

    #[tokio::test]
    async fn test_ready_when_all_components_healthy() {
        let service = HealthService::new(
            InMemoryBroker::new(1),
            Arc::new(InMemoryEndpointRegistry::new()),
        );
        let response = service.readiness().await.unwrap();
        assert_eq!(response.components.len(), 2);
    }

    #[tokio::test]
    async fn test_not_ready_names_failing_component() {
        let registry = Arc::new(InMemoryEndpointRegistry::new());
        registry.set_unavailable(true);
        let service = HealthService::new(InMemoryBroker::new(1), registry);

        let response = service.readiness().await.unwrap_err();
        assert_eq!(response.status, "not_ready");
        let failing: Vec<_> = response
            .components
            .iter()
            .filter(|c| !c.healthy)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(failing, vec!["registry"]);
    }
}
