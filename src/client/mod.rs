//! # Cache Client Library
//!
//! Wraps an application's cache so that every read and write becomes a cache
//! access event on the broker topic, without going through the gateway.
//!
//! ```rust,no_run
//! # #[cfg(all(feature = "kafka", feature = "redis"))]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use cacheflow::client::{InstrumentedCache, InstrumentedCacheConfig, RedisKeyValueStore};
//! use cacheflow::config::BrokerConfig;
//! use cacheflow::messaging::KafkaEventPublisher;
//!
//! let store = RedisKeyValueStore::connect("redis://localhost:6379").await?;
//! let publisher = Arc::new(KafkaEventPublisher::new(&BrokerConfig::default())?);
//! let cache = InstrumentedCache::new(store, publisher, InstrumentedCacheConfig::default());
//!
//! cache.set("session:1", "payload").await?;
//! let _value = cache.get("session:1").await?;
//! # Ok(())
//! # }
//! ```

pub mod instrumented_cache;
pub mod store;

pub use instrumented_cache::{InstrumentedCache, InstrumentedCacheConfig, DEFAULT_TTL};
pub use store::{InMemoryKeyValueStore, KeyValueStore, StoreError, StoreResult};
#[cfg(feature = "redis")]
pub use store::RedisKeyValueStore;
