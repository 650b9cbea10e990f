//! # Forwarding Endpoint Registry
//!
//! Records, per submitter, which cache instance forwards its telemetry. The
//! gateway writes here on registration; nothing in the relay reads it.

pub mod errors;
pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod traits;

pub use errors::{RegistryError, RegistryResult};
pub use in_memory::InMemoryEndpointRegistry;
#[cfg(feature = "redis")]
pub use self::redis::RedisEndpointRegistry;
pub use traits::EndpointRegistry;
