//! Key-value stores the instrumented cache can wrap.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("Cache store connection error: {0}")]
    Connection(String),

    #[error("Cache store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(feature = "redis")]
pub use self::redis_store::RedisKeyValueStore;

#[cfg(feature = "redis")]
mod redis_store {
    use super::*;
    use crate::config::redact_url;
    use tracing::debug;

    /// Redis-backed store using `ConnectionManager`
    #[derive(Clone)]
    pub struct RedisKeyValueStore {
        connection_manager: redis::aio::ConnectionManager,
    }

    impl std::fmt::Debug for RedisKeyValueStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisKeyValueStore")
                .field("connection_manager", &"ConnectionManager")
                .finish()
        }
    }

    impl RedisKeyValueStore {
        pub async fn connect(url: &str) -> StoreResult<Self> {
            let client = redis::Client::open(url).map_err(|e| {
                StoreError::Connection(format!("Failed to create Redis client: {}", e))
            })?;
            let connection_manager = redis::aio::ConnectionManager::new(client)
                .await
                .map_err(|e| StoreError::Connection(format!("Failed to connect to Redis: {}", e)))?;

            debug!(url = %redact_url(url), "Redis cache store connected");
            Ok(Self { connection_manager })
        }
    }

    #[async_trait]
    impl KeyValueStore for RedisKeyValueStore {
        async fn get(&self, key: &str) -> StoreResult<Option<String>> {
            let mut conn = self.connection_manager.clone();
            redis::cmd("GET")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::Backend(format!("Redis GET failed: {}", e)))
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
            let mut conn = self.connection_manager.clone();
            redis::cmd("SETEX")
                .arg(key)
                .arg(ttl.as_secs().max(1))
                .arg(value)
                .query_async::<()>(&mut conn)
                .await
                .map_err(|e| StoreError::Backend(format!("Redis SETEX failed: {}", e)))
        }

        fn provider_name(&self) -> &'static str {
            "redis"
        }
    }
}
