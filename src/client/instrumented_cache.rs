//! # Instrumented Cache
//!
//! A cache wrapper that reports every `get` and `set` to the event topic.
//! Telemetry is best effort: a failed publish is logged and the cache call
//! still returns its own result.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use super::store::{KeyValueStore, StoreResult};
use crate::messaging::EventPublisher;
use crate::models::{CacheEvent, EventEnvelope};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct InstrumentedCacheConfig {
    pub topic: String,
    /// Partition key and `user_id` of emitted events
    pub submitter_id: Option<String>,
    pub default_ttl: Duration,
}

impl Default for InstrumentedCacheConfig {
    fn default() -> Self {
        Self {
            topic: "cache_access_logs".to_string(),
            submitter_id: None,
            default_ttl: DEFAULT_TTL,
        }
    }
}

pub struct InstrumentedCache<S: KeyValueStore> {
    store: S,
    publisher: Arc<dyn EventPublisher>,
    config: InstrumentedCacheConfig,
}

impl<S: KeyValueStore + std::fmt::Debug> std::fmt::Debug for InstrumentedCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedCache")
            .field("store", &self.store)
            .field("publisher", &self.publisher.provider_name())
            .field("config", &self.config)
            .finish()
    }
}

impl<S: KeyValueStore> InstrumentedCache<S> {
    pub fn new(store: S, publisher: Arc<dyn EventPublisher>, config: InstrumentedCacheConfig) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read `key`; emits `GET` with `hit` set when a value was found
    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self.store.get(key).await?;
        self.emit(key, "GET", value.is_some()).await;
        Ok(value)
    }

    /// Write `key` with the default TTL; emits `SET`
    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_with_ttl(key, value, self.config.default_ttl).await
    }

    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.store.set(key, value, ttl).await?;
        self.emit(key, "SET", false).await;
        Ok(())
    }

    async fn emit(&self, key: &str, action: &str, hit: bool) {
        let envelope = EventEnvelope::new(
            self.config.submitter_id.clone(),
            CacheEvent::new(key, action, hit, Utc::now()),
        );
        let payload = match envelope.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, action, error = %e, "Failed to encode cache event");
                return;
            }
        };

        let partition_key = self.config.submitter_id.as_deref().unwrap_or(key);
        if let Err(e) = self
            .publisher
            .publish(&self.config.topic, partition_key, &payload)
            .await
        {
            warn!(key, action, error = %e, "Failed to publish cache event");
        }
    }
}
