//! # Storage Module
//!
//! Durable sink for cache events. Rows are identified by
//! `(resource_id, timestamp)`; a second write with the same identity replaces
//! the first, which is what makes broker redelivery harmless.

pub mod errors;
pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use errors::StorageError;
pub use in_memory::InMemoryEventSink;
pub use postgres::PgEventSink;
pub use traits::{EventSink, InsertOutcome};
