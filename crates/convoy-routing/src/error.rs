//! Error types for route binding operations.

use convoy_state::StateError;
use thiserror::Error;

pub type RoutingResult<T> = Result<T, RoutingError>;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
}

impl RoutingError {
    /// True when re-issuing the same per-binding transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RoutingError::State(e) => e.is_retryable(),
            RoutingError::Validation { .. } => false,
        }
    }
}
