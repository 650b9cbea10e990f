//! `POST /v1/events`

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use super::StatusResponse;
use crate::services::SubmitEventRequest;
use crate::web::errors::ApiResult;
use crate::web::state::GatewayState;

/// The body is parsed here rather than by the `Json` extractor so that every
/// malformed submission gets the same 400 body.
pub async fn submit_event(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> ApiResult<Json<StatusResponse>> {
    let request: SubmitEventRequest = serde_json::from_slice(&body)?;
    state.ingress_service().submit_event(request).await?;
    Ok(Json(StatusResponse::ok("Log sent to Kafka")))
}
