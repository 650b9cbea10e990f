//! Gateway services, callable without the HTTP layer.

pub mod health_service;
pub mod ingress_service;

pub use health_service::{BasicHealthResponse, ComponentHealth, HealthService, ReadinessResponse};
pub use ingress_service::{
    IngressError, IngressService, RegisterEndpointRequest, SubmitEventRequest,
};
