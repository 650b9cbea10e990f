//! Shared state handed to every gateway handler.

use std::sync::Arc;

use crate::config::WebConfig;
use crate::messaging::EventPublisher;
use crate::registry::EndpointRegistry;
use crate::services::{HealthService, IngressService};

#[derive(Debug)]
pub struct GatewayState {
    pub config: WebConfig,
    ingress: IngressService,
    health: HealthService,
}

impl GatewayState {
    pub fn new(
        config: WebConfig,
        publisher: Arc<dyn EventPublisher>,
        registry: Arc<dyn EndpointRegistry>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            config,
            ingress: IngressService::new(Arc::clone(&publisher), Arc::clone(&registry), topic),
            health: HealthService::new(publisher, registry),
        }
    }

    pub fn ingress_service(&self) -> &IngressService {
        &self.ingress
    }

    pub fn health_service(&self) -> &HealthService {
        &self.health
    }
}
