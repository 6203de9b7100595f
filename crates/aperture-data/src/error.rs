//! Error type for data-provider operations.

use thiserror::Error;

use aperture_evaluator::EvaluatorError;

/// Error type for data-provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// An operation that expects a specific item to exist was given an
    /// item its evaluator denies. Signalled explicitly rather than
    /// silently dropping the item and returning stale state.
    #[error("item of type '{type_name}' is not granted by its evaluator")]
    ItemNotGranted { type_name: &'static str },

    /// The inner source's native filter passed an item the evaluator
    /// denies: the filter was mis-derived. Fatal inconsistency.
    #[error(
        "native filter of the wrapped source passed an item of type \
         '{type_name}' that its evaluator denies"
    )]
    FilterIntegrity { type_name: &'static str },

    /// The inner item source failed.
    #[error("item source error: {0}")]
    Source(String),

    /// Evaluator configuration error.
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),
}

/// Result type for data-provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
