use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("limit must be at least 1")]
    ZeroLimit,
    #[error("sync interval must be at least {min}s (got {got}s)")]
    SyncIntervalTooShort { got: u64, min: u64 },
    #[error("default page size must be at least 1")]
    ZeroPageSize,
    #[error("initialization timeout must be at least 1s")]
    ZeroInitTimeout,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, CoreError::Network(_))
    }
}
