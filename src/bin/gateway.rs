//! # cacheflow Gateway
//!
//! HTTP ingress: accepts cache access events and endpoint registrations,
//! publishes events to Kafka and records registrations in Redis.
//!
//! ```bash
//! cacheflow-gateway --config config/cacheflow.toml
//! CACHEFLOW_KAFKA_BROKERS=kafka:9092 CACHEFLOW_REDIS_URL=redis://redis:6379 cacheflow-gateway
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use cacheflow::config::ConfigLoader;
use cacheflow::logging;
use cacheflow::messaging::KafkaEventPublisher;
use cacheflow::pipeline::wait_for_termination;
use cacheflow::registry::RedisEndpointRegistry;
use cacheflow::web::{create_app, GatewayState};

#[derive(Parser, Debug)]
#[command(name = "cacheflow-gateway")]
#[command(about = "HTTP ingress for cache access telemetry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "CACHEFLOW_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref()).context("loading configuration")?;
    logging::init_tracing(&config.logging);
    config
        .validate_for_gateway()
        .context("validating gateway configuration")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting cacheflow gateway");
    info!(config = %config.sanitized(), "Effective configuration");

    let publisher = Arc::new(
        KafkaEventPublisher::new(&config.broker).context("creating Kafka producer")?,
    );
    let registry = Arc::new(
        RedisEndpointRegistry::from_config(&config.registry)
            .await
            .context("connecting to Redis")?,
    );

    let state = Arc::new(GatewayState::new(
        config.web.clone(),
        publisher,
        registry,
        config.broker.topic.clone(),
    ));
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.web.bind_address)
        .await
        .with_context(|| format!("binding {}", config.web.bind_address))?;
    info!(bind_address = %config.web.bind_address, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_termination())
        .await
        .context("serving HTTP")?;

    info!("Gateway shutdown complete");
    Ok(())
}
