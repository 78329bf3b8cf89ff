//! Engine error taxonomy.
//!
//! A bulk result with failed items is NOT an error: per-item failures are
//! aggregated into `BulkOperationResult`. These variants cover whole-call
//! failures only.

use persistence::StoreError;
use validator::{ValidationError, ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Request payload failed validation before any mutation began.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced account, tool, or assignment does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The operation conflicts with existing state.
    #[error("{0}")]
    Conflict(String),

    /// The caller exceeded the sliding-window ceiling for this operation.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// A store call did not complete within the configured deadline.
    #[error("store operation timed out")]
    Timeout,

    /// Unexpected store failure.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("record".into()),
            StoreError::Conflict => Self::Conflict("record already exists".into()),
            other => Self::Store(other),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        let message = err
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| err.code.to_string());
        Self::Validation(message)
    }
}

impl From<ValidationErrors> for EngineError {
    fn from(err: ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}
