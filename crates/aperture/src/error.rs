//! Top-level error type for the Aperture facade.

use thiserror::Error;

use aperture_binding::BindingError;
use aperture_data::ProviderError;
use aperture_engine::EngineError;
use aperture_evaluator::EvaluatorError;

/// Error type for the embedding-application surface.
#[derive(Debug, Error)]
pub enum ApertureError {
    /// `start` was called for a session that already holds an
    /// authorization context.
    #[error("authorization already started for this session")]
    AlreadyStarted,

    /// Evaluator configuration error.
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),

    /// Binding-store contract violation or input error.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Apply-engine error.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Data-provider error.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, ApertureError>;
