//! # Structured Logging Module
//!
//! Environment-aware `tracing` setup shared by the gateway and relay binaries.
//! `RUST_LOG` always wins; otherwise the configured level, otherwise a level
//! derived from `CACHEFLOW_ENV`.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber once per process
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = config
                .level
                .clone()
                .unwrap_or_else(|| get_log_level(&environment));
            EnvFilter::new(level)
        });

        let layer = match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(false)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(std::io::stdout().is_terminal())
                .boxed(),
        };

        // try_init: tests and embedding hosts may already own the global subscriber
        if tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing");
            return;
        }

        tracing::info!(
            environment = %environment,
            format = ?config.format,
            "Structured logging initialized"
        );
    });
}

/// Current deployment environment
pub fn get_environment() -> String {
    std::env::var("CACHEFLOW_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}
