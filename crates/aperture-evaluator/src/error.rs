//! Error type for evaluator registration and resolution.
//!
//! All of these are configuration errors: they indicate the embedding
//! application wired its evaluators incorrectly, and none of them is
//! retried automatically.

use thiserror::Error;

/// Error type for evaluator registration and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluatorError {
    /// Two evaluators were registered for the same exact permission type.
    #[error("duplicate evaluator registered for permission type '{type_name}'")]
    DuplicateEvaluator { type_name: &'static str },

    /// No registered evaluator is compatible with the permission type.
    #[error("no evaluator found for permission type '{type_name}'")]
    NoEvaluatorFound { type_name: &'static str },

    /// More than one registered evaluator is compatible with the permission
    /// type under the strict resolution policy.
    #[error(
        "conflicting evaluators for permission type '{type_name}': \
         compatible candidates are {candidates:?}"
    )]
    ConflictingEvaluators {
        type_name: &'static str,
        candidates: Vec<&'static str>,
    },

    /// A permission value no longer exposes the generalization shape its
    /// type was resolved with.
    #[error(
        "permission value of type '{type_name}' does not match the \
         generalization path resolved for its type"
    )]
    GeneralizationMismatch { type_name: &'static str },
}

/// Result type for evaluator operations.
pub type Result<T> = std::result::Result<T, EvaluatorError>;
