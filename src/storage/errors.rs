//! # Storage Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Pool exhausted or closed, connection refused or reset
    #[error("Storage connection error: {0}")]
    Connection(String),

    /// The row violates a table constraint; retrying cannot help
    #[error("Storage constraint violation: {0}")]
    Constraint(String),

    #[error("Storage query error: {0}")]
    Query(String),

    #[error("Storage write timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl StorageError {
    /// Whether a later attempt of the same write can succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Constraint(_))
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_error) => {
                // SQLSTATE class 22 (data exception) and 23 (integrity constraint)
                let permanent = db_error
                    .code()
                    .is_some_and(|code| code.starts_with("22") || code.starts_with("23"));
                if permanent {
                    Self::Constraint(db_error.message().to_string())
                } else {
                    Self::Query(db_error.message().to_string())
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connection(error.to_string()),
            _ => Self::Query(error.to_string()),
        }
    }
}
