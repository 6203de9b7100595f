//! Target identity and the host-framework seams.
//!
//! The engine treats UI elements as opaque targets: a component can have its
//! visibility read and written, a view can report its navigation parameters.
//! The host assigns each target a stable [`TargetId`]; the engine keys its
//! maps by id and holds the target itself only weakly.

use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identity
// ============================================================================

/// Stable host-assigned identifier for a bindable target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId(u64);

impl TargetId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TargetId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<TargetId> for u64 {
    fn from(id: TargetId) -> Self {
        id.0
    }
}

/// The two kinds of bindable targets.
///
/// Components are gated by visibility, views by navigability. The binding
/// stores are structurally identical but kept as two instances so a bug in
/// one kind's bookkeeping cannot corrupt the other's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Component,
    View,
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Component => write!(f, "component"),
            TargetKind::View => write!(f, "view"),
        }
    }
}

// ============================================================================
// Host seams
// ============================================================================

/// Anything the binding store can hold an association for.
pub trait BindTarget: Send + Sync {
    /// The host-assigned stable identifier of this target.
    fn target_id(&self) -> TargetId;
}

/// A UI element whose visibility the engine owns once bound.
///
/// Between two `apply` calls the engine expects the visibility it last wrote
/// to still be in place; direct external mutation is a contract violation
/// detected at the next `apply`.
pub trait Component: BindTarget {
    fn set_visible(&self, visible: bool);
    fn is_visible(&self) -> bool;
}

/// A navigable unit gated by the before-navigation check.
pub trait View: BindTarget {
    /// The navigation parameters string identifying this view to the host
    /// navigation subsystem.
    fn navigation_params(&self) -> String;
}

/// An item source the engine refreshes after visibility changes, so
/// permission-filtered item sets reflect the new grants.
pub trait Refreshable: Send + Sync {
    fn refresh(&self);
}

/// Shared handle to a host component.
pub type ComponentRef = Arc<dyn Component>;

/// Shared handle to a host view.
pub type ViewRef = Arc<dyn View>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_id_roundtrip() {
        let id = TargetId::new(42);
        assert_eq!(u64::from(id), 42);
        assert_eq!(TargetId::from(42), id);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_target_kind_display() {
        assert_eq!(TargetKind::Component.to_string(), "component");
        assert_eq!(TargetKind::View.to_string(), "view");
    }
}
