//! Error types for rollout bookkeeping.

use convoy_state::StateError;
use thiserror::Error;

pub type RolloutResult<T> = Result<T, RolloutError>;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error(transparent)]
    State(#[from] StateError),

    /// Malformed input; aborts the current transaction only.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("deployment not found: {0}")]
    DeploymentNotFound(String),
}

impl RolloutError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        RolloutError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            RolloutError::State(e) => e.is_retryable(),
            _ => false,
        }
    }
}
