//! # Messaging Module
//!
//! Broker abstraction for the event stream. The gateway publishes accepted
//! events keyed by submitter; the relay consumes them under a consumer group and
//! commits offsets explicitly.
//!
//! Providers:
//! - [`kafka`] - rdkafka producer and stream consumer (feature `kafka`)
//! - [`in_memory`] - partitioned in-process broker for tests and local runs

pub mod errors;
pub mod in_memory;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod traits;
pub mod types;

pub use errors::MessagingError;
pub use in_memory::{InMemoryBroker, InMemoryConsumer};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaEventConsumer, KafkaEventPublisher};
pub use traits::{EventConsumer, EventPublisher};
pub use types::{BrokerMessage, MessagePosition, PublishReceipt};
