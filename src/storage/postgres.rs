//! # PostgreSQL Event Sink
//!
//! Single-row inserts into the cache log table, one pool shared by all workers.
//! The table name is validated by configuration before it is interpolated.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use super::traits::{EventSink, InsertOutcome};
use super::StorageError;
use crate::config::{redact_url, StorageConfig};
use crate::models::CacheEvent;

#[derive(Debug, Clone)]
pub struct PgEventSink {
    pool: PgPool,
    insert_sql: String,
}

impl PgEventSink {
    /// Connect a pool sized from configuration
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.database_url)
            .await?;

        info!(
            database_url = %redact_url(&config.database_url),
            max_connections = config.max_connections,
            table = %config.table,
            "Storage pool connected"
        );

        Ok(Self::with_pool(pool, &config.table))
    }

    pub fn with_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            insert_sql: insert_statement(table),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `xmax = 0` only holds for a freshly inserted tuple, so it tells the two
/// upsert branches apart without a second query.
fn insert_statement(table: &str) -> String {
    format!(
        "INSERT INTO {table} (resource_id, action, hit, timestamp) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (resource_id, timestamp) \
         DO UPDATE SET action = EXCLUDED.action, hit = EXCLUDED.hit \
         RETURNING (xmax = 0) AS inserted"
    )
}

#[async_trait]
impl EventSink for PgEventSink {
    async fn insert(&self, event: &CacheEvent) -> Result<InsertOutcome, StorageError> {
        let inserted: bool = sqlx::query_scalar(&self.insert_sql)
            .bind(&event.resource_id)
            .bind(&event.action)
            .bind(event.hit)
            .bind(event.timestamp)
            .fetch_one(&self.pool)
            .await?;

        debug!(
            resource_id = %event.resource_id,
            timestamp = %event.timestamp,
            inserted,
            "Event written"
        );

        Ok(if inserted {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Replaced
        })
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "postgres"
    }
}
