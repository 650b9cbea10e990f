//! # Gateway Health Handlers
//!
//! Handlers delegate to [`HealthService`](crate::services::HealthService).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::services::{BasicHealthResponse, ReadinessResponse};
use crate::web::state::GatewayState;

/// Liveness: GET /health
pub async fn health_check(State(state): State<Arc<GatewayState>>) -> Json<BasicHealthResponse> {
    Json(state.health_service().basic_health())
}

/// Readiness: GET /health/ready
///
/// 503 with the per-component report when the broker or registry is unreachable.
pub async fn readiness_check(
    State(state): State<Arc<GatewayState>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    state
        .health_service()
        .readiness()
        .await
        .map(Json)
        .map_err(|report| (StatusCode::SERVICE_UNAVAILABLE, Json(report)))
}
