use thiserror::Error;

/// Classified errors surfaced by the maintenance engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed week number, year out of range, or bad cadence descriptor.
    /// Never silently clamped.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced asset or plan does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness race on insert. Recovered internally by re-fetching;
    /// callers normally never observe this kind.
    #[error("conflicting concurrent write: {0}")]
    ConflictRetryable(String),

    /// The persistent store cannot be reached. No partial writes happen on
    /// this path.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl EngineError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        EngineError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        EngineError::NotFound(msg.into())
    }

    /// Whether the caller may retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::ConflictRetryable(_) | EngineError::StorageUnavailable(_)
        )
    }
}
