//! Error types for post evaluation

use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderError;
use crate::service::prompts::PromptError;

/// Fatal evaluation errors; degraded sub-analyses never surface here
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Classification failed: {0}")]
    ClassificationFailed(#[source] ProviderError),

    #[error("Evaluation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Prompt rendering failed: {0}")]
    Prompt(#[from] PromptError),

    #[error("Invalid aggregate state: {0}")]
    InvalidAggregateState(String),
}
