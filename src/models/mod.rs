//! Domain types shared by the gateway, the relay pipeline and the client library.

pub mod cache_event;
pub mod forwarding_endpoint;

pub use cache_event::{CacheEvent, EventEnvelope, EventValidationError};
pub use forwarding_endpoint::ForwardingEndpoint;
