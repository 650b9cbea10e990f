//! Storage sink trait.

use async_trait::async_trait;

use super::StorageError;
use crate::models::CacheEvent;

/// What an insert did to the `(resource_id, timestamp)` row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same identity existed and now carries this event's fields
    Replaced,
}

#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Write one event. Idempotent on `(resource_id, timestamp)`: last write wins.
    async fn insert(&self, event: &CacheEvent) -> Result<InsertOutcome, StorageError>;

    async fn health_check(&self) -> Result<(), StorageError>;

    fn provider_name(&self) -> &'static str;
}
