//! Gateway routes. The unversioned paths are kept for existing cache clients.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::web::{handlers, state::GatewayState};

pub fn health_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
}

pub fn event_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/v1/events", post(handlers::events::submit_event))
        .route("/log", post(handlers::events::submit_event))
}

pub fn registration_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route(
            "/v1/registrations",
            post(handlers::registrations::register_endpoint),
        )
        .route("/init", post(handlers::registrations::register_endpoint))
}
