//! Error type for the apply engine.

use thiserror::Error;

use aperture_binding::BindingError;
use aperture_evaluator::EvaluatorError;
use aperture_types::TargetId;

/// Error type for apply-engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A bound component's visibility was changed outside the engine since
    /// the last apply. The engine owns visibility exclusively once a target
    /// is bound; the caller must undo the external mutation and re-apply.
    #[error(
        "visibility of component {target} was mutated outside the engine \
         (last applied {expected}, found {found})"
    )]
    ExternalVisibilityMutation {
        target: TargetId,
        expected: bool,
        found: bool,
    },

    /// Evaluator configuration error surfaced during apply.
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),

    /// Binding-store contract violation surfaced during apply.
    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
