//! `POST /v1/registrations`

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use super::StatusResponse;
use crate::services::RegisterEndpointRequest;
use crate::web::errors::ApiResult;
use crate::web::state::GatewayState;

pub async fn register_endpoint(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> ApiResult<Json<StatusResponse>> {
    let request: RegisterEndpointRequest = serde_json::from_slice(&body)?;
    state.ingress_service().register_endpoint(request).await?;
    Ok(Json(StatusResponse::ok("User initialized")))
}
