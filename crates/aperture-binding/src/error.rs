//! Error type for binding-store operations.

use thiserror::Error;

use aperture_types::TargetKind;

/// Error type for binding-store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// A previous bind/unbind on this store was never completed with
    /// `to()`, `from()`, or `from_all()`.
    #[error(
        "an earlier {kind} bind/unbind was opened but never completed; \
         the fluent call must end with to(), from(), or from_all()"
    )]
    UnfinishedTransaction { kind: TargetKind },

    /// `bind`/`unbind` was called with no targets.
    #[error("at least one target is required")]
    EmptyTargets,

    /// `to`/`from` was called with no permissions.
    #[error("at least one permission is required")]
    EmptyPermissions,

    /// `Reverter::revert` was called a second time.
    #[error("this reverter has already been used; revert() is usable exactly once")]
    ReverterSpent,
}

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, BindingError>;
