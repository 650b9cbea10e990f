//! In-memory endpoint registry for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::EndpointRegistry;
use super::{RegistryError, RegistryResult};
use crate::models::ForwardingEndpoint;

#[derive(Debug, Default)]
pub struct InMemoryEndpointRegistry {
    endpoints: RwLock<HashMap<String, ForwardingEndpoint>>,
    unavailable: AtomicBool,
}

impl InMemoryEndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the backing store were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }

    fn check_available(&self) -> RegistryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Connection(
                "in-memory registry unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl EndpointRegistry for InMemoryEndpointRegistry {
    async fn register(&self, endpoint: &ForwardingEndpoint) -> RegistryResult<()> {
        self.check_available()?;
        self.endpoints
            .write()
            .insert(endpoint.submitter_id.clone(), endpoint.clone());
        Ok(())
    }

    async fn lookup(&self, submitter_id: &str) -> RegistryResult<Option<ForwardingEndpoint>> {
        self.check_available()?;
        Ok(self.endpoints.read().get(submitter_id).cloned())
    }

    async fn health_check(&self) -> RegistryResult<()> {
        self.check_available()
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(port: u16) -> ForwardingEndpoint {
        ForwardingEndpoint {
            submitter_id: "u1".to_string(),
            host: "cache-1.internal".to_string(),
            port,
            credential: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_overwrites() {
        let registry = InMemoryEndpointRegistry::new();
        registry.register(&endpoint(6379)).await.unwrap();
        registry.register(&endpoint(6380)).await.unwrap();

        let found = registry.lookup("u1").await.unwrap().unwrap();
        assert_eq!(found.port, 6380);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_registry_fails() {
        let registry = InMemoryEndpointRegistry::new();
        registry.set_unavailable(true);
        assert!(registry.register(&endpoint(6379)).await.is_err());
        assert!(registry.health_check().await.is_err());
    }
}
