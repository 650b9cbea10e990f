//! Registry error types.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum RegistryError {
    #[error("Registry connection error: {0}")]
    Connection(String),

    #[error("Registry backend error: {0}")]
    Backend(String),

    /// A stored record is missing fields or has an unparseable port
    #[error("Corrupt registry record at {key}: {message}")]
    CorruptRecord { key: String, message: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;
