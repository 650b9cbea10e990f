//! Endpoint registry trait.

use async_trait::async_trait;

use super::RegistryResult;
use crate::models::ForwardingEndpoint;

/// Keyed store of where each submitter's cache instance lives
#[async_trait]
pub trait EndpointRegistry: Send + Sync + 'static {
    /// Create or overwrite the record for `endpoint.submitter_id`
    async fn register(&self, endpoint: &ForwardingEndpoint) -> RegistryResult<()>;

    async fn lookup(&self, submitter_id: &str) -> RegistryResult<Option<ForwardingEndpoint>>;

    async fn health_check(&self) -> RegistryResult<()>;

    fn provider_name(&self) -> &'static str;
}
