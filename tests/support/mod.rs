//! Shared harness: in-memory broker, sink and registry wired the way the
//! binaries wire the real providers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use cacheflow::config::RelayConfig;
use cacheflow::messaging::InMemoryBroker;
use cacheflow::pipeline::{PipelineError, PipelineReport, RelayPipeline, ShutdownCoordinator};
use cacheflow::registry::InMemoryEndpointRegistry;
use cacheflow::storage::InMemoryEventSink;
use cacheflow::web::{create_app, GatewayState};

pub const EXAMPLE_EVENT: &str = r#"{"user_id":"u1","resource_id":"r42","action":"read","hit":true,"timestamp":"2024-01-01T00:00:00Z"}"#;

pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.pipeline.worker_count = 3;
    config.pipeline.queue_capacity = 8;
    config.retry.max_attempts = 3;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 5;
    config
}

pub struct Stack {
    pub broker: Arc<InMemoryBroker>,
    pub sink: Arc<InMemoryEventSink>,
    pub registry: Arc<InMemoryEndpointRegistry>,
    pub config: RelayConfig,
}

impl Stack {
    pub fn new(partitions: usize) -> Self {
        Self::with_config(partitions, test_config())
    }

    pub fn with_config(partitions: usize, config: RelayConfig) -> Self {
        Self {
            broker: InMemoryBroker::new(partitions),
            sink: Arc::new(InMemoryEventSink::new()),
            registry: Arc::new(InMemoryEndpointRegistry::new()),
            config,
        }
    }

    pub fn gateway(&self) -> Router {
        let state = GatewayState::new(
            self.config.web.clone(),
            self.broker.clone(),
            self.registry.clone(),
            self.config.broker.topic.clone(),
        );
        create_app(Arc::new(state))
    }

    /// Start a relay as a fresh consumer-group member
    pub fn start_relay(&self) -> RunningRelay {
        let consumer = self
            .broker
            .consumer(&self.config.broker.group_id, &self.config.broker.topic);
        let pipeline = RelayPipeline::new(
            Arc::new(consumer),
            self.sink.clone(),
            self.broker.clone(),
            &self.config,
        );
        let shutdown = pipeline.shutdown_handle();
        let handle = tokio::spawn(pipeline.run(std::future::pending()));
        RunningRelay { shutdown, handle }
    }

    pub fn committed(&self, partition: i32) -> Option<i64> {
        self.broker.committed_offset(
            &self.config.broker.group_id,
            &self.config.broker.topic,
            partition,
        )
    }

    pub fn dead_letters(&self) -> Vec<cacheflow::pipeline::DeadLetterRecord> {
        self.broker
            .messages(&self.config.dead_letter.topic)
            .iter()
            .map(|m| serde_json::from_slice(m.payload_bytes()).expect("dead-letter record"))
            .collect()
    }
}

pub struct RunningRelay {
    pub shutdown: Arc<ShutdownCoordinator>,
    pub handle: JoinHandle<Result<PipelineReport, PipelineError>>,
}

impl RunningRelay {
    pub async fn stop(self) -> Result<PipelineReport, PipelineError> {
        self.shutdown.begin_drain();
        self.join().await
    }

    pub async fn join(self) -> Result<PipelineReport, PipelineError> {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("relay did not stop in time")
            .expect("relay task panicked")
    }
}

pub async fn request(app: &Router, method: &str, path: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

pub async fn post(app: &Router, path: &str, body: &str) -> (StatusCode, serde_json::Value) {
    request(app, "POST", path, body).await
}

pub async fn get(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    request(app, "GET", path, "").await
}

pub async fn wait_until<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for {what}");
}

pub fn event_json(user: &str, resource: &str, action: &str, hit: bool, timestamp: &str) -> String {
    serde_json::json!({
        "user_id": user,
        "resource_id": resource,
        "action": action,
        "hit": hit,
        "timestamp": timestamp,
    })
    .to_string()
}
