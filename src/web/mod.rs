//! # Gateway Web API
//!
//! Event submission, endpoint registration and health probes over axum.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use state::GatewayState;

/// Build the gateway router with its middleware stack
pub fn create_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let common_middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_millis(state.config.request_timeout_ms),
        ))
        .layer(cors);

    let app = Router::new()
        .merge(routes::health_routes())
        .merge(routes::event_routes())
        .merge(routes::registration_routes())
        .layer(common_middleware)
        .with_state(state);

    info!("Gateway application created");
    app
}
