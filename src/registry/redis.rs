//! Redis endpoint registry.
//!
//! One hash per submitter at `<prefix><submitter_id>` with fields `host`,
//! `port` and `password`.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::traits::EndpointRegistry;
use super::{RegistryError, RegistryResult};
use crate::config::{redact_url, RegistryConfig};
use crate::models::ForwardingEndpoint;

#[derive(Clone)]
pub struct RedisEndpointRegistry {
    connection_manager: redis::aio::ConnectionManager,
    key_prefix: String,
}

impl std::fmt::Debug for RedisEndpointRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEndpointRegistry")
            .field("connection_manager", &"ConnectionManager")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisEndpointRegistry {
    pub async fn from_config(config: &RegistryConfig) -> RegistryResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str()).map_err(|e| {
            RegistryError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| RegistryError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        debug!(url = %redact_url(&config.redis_url), "Redis endpoint registry connected");

        Ok(Self {
            connection_manager,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key_for(&self, submitter_id: &str) -> String {
        format!("{}{}", self.key_prefix, submitter_id)
    }
}

#[async_trait]
impl EndpointRegistry for RedisEndpointRegistry {
    async fn register(&self, endpoint: &ForwardingEndpoint) -> RegistryResult<()> {
        let mut conn = self.connection_manager.clone();
        let key = self.key_for(&endpoint.submitter_id);

        redis::cmd("HSET")
            .arg(&key)
            .arg("host")
            .arg(&endpoint.host)
            .arg("port")
            .arg(endpoint.port)
            .arg("password")
            .arg(&endpoint.credential)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| RegistryError::Backend(format!("Redis HSET failed: {}", e)))?;

        debug!(key = %key, host = %endpoint.host, port = endpoint.port, "Endpoint registered");
        Ok(())
    }

    async fn lookup(&self, submitter_id: &str) -> RegistryResult<Option<ForwardingEndpoint>> {
        let mut conn = self.connection_manager.clone();
        let key = self.key_for(submitter_id);

        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| RegistryError::Backend(format!("Redis HGETALL failed: {}", e)))?;

        if fields.is_empty() {
            return Ok(None);
        }

        let field = |name: &str| {
            fields
                .get(name)
                .cloned()
                .ok_or_else(|| RegistryError::CorruptRecord {
                    key: key.clone(),
                    message: format!("missing field '{name}'"),
                })
        };
        let port = field("port")?
            .parse::<u16>()
            .map_err(|e| RegistryError::CorruptRecord {
                key: key.clone(),
                message: format!("invalid port: {e}"),
            })?;

        Ok(Some(ForwardingEndpoint {
            submitter_id: submitter_id.to_string(),
            host: field("host")?,
            port,
            credential: fields.get("password").cloned().unwrap_or_default(),
        }))
    }

    async fn health_check(&self) -> RegistryResult<()> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| RegistryError::Connection(format!("Redis PING failed: {}", e)))?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}
