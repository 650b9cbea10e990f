#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, TimescaleDB in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # cacheflow
//!
//! Durable relay for cache-access telemetry.
//!
//! ## Overview
//!
//! Cache nodes report every hit and miss. The gateway accepts those reports
//! over HTTP and publishes them to a Kafka topic keyed by submitter; the relay
//! consumes the topic under a consumer group and writes each event into a
//! TimescaleDB table keyed by `(resource_id, timestamp)`.
//!
//! ```text
//! gateway ──► kafka topic ──► reader ──► bounded queue ──► workers ──► postgres
//!                                                            │
//!                                                            └──► dead-letter topic
//! ```
//!
//! ## Delivery
//!
//! Offsets are committed only behind messages that were written or
//! dead-lettered, so a crash replays at most the uncommitted tail. Replays
//! collapse onto the same row.
//!
//! ## Module Organization
//!
//! - [`models`] - cache events and forwarding endpoints
//! - [`messaging`] - broker publisher/consumer traits, Kafka and in-memory providers
//! - [`storage`] - event sink trait, Postgres and in-memory providers
//! - [`registry`] - forwarding endpoint registry (Redis, in-memory)
//! - [`pipeline`] - reader, worker pool, retry, dead-letter and shutdown
//! - [`services`] - gateway request handling independent of HTTP
//! - [`web`] - axum router for the gateway
//! - [`client`] - instrumented cache wrapper for applications
//! - [`config`] - TOML configuration with environment overrides
//! - [`logging`] - tracing subscriber setup
//! - [`error`] - top-level error aggregation

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod services;
pub mod storage;
pub mod web;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use models::{CacheEvent, EventEnvelope, ForwardingEndpoint};
pub use pipeline::{PipelineReport, PipelineState, RelayPipeline};
