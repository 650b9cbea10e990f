//! Error types for the cacheflow relay.
//!
//! Each subsystem owns a structured error enum; [`RelayError`] aggregates them for
//! callers that drive several subsystems at once (the binaries, mostly).

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::pipeline::PipelineError;
use crate::registry::RegistryError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RelayResult<T> = Result<T, RelayError>;
