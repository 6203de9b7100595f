//! Last-applied visibility tracking.
//!
//! The tracker exists for one purpose: detecting that something outside the
//! engine mutated a bound component's visibility between applies. It is
//! never consulted to decide visibility.

use dashmap::DashMap;

use aperture_types::TargetId;

/// Target to last-applied visibility.
#[derive(Debug, Default)]
pub struct VisibilityTracker {
    last_applied: DashMap<TargetId, bool>,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the visibility the engine just committed for `target`.
    pub fn record(&self, target: TargetId, visible: bool) {
        self.last_applied.insert(target, visible);
    }

    /// The visibility last applied to `target`, if it was ever applied.
    pub fn last_applied(&self, target: TargetId) -> Option<bool> {
        self.last_applied.get(&target).map(|visible| *visible)
    }

    /// Forgets `target`, e.g. after a full unbind.
    pub fn clear(&self, target: TargetId) {
        self.last_applied.remove(&target);
    }

    /// Retains only the given targets; bindings and tracker prune together.
    pub fn retain(&self, targets: &[TargetId]) {
        let keep: std::collections::HashSet<TargetId> = targets.iter().copied().collect();
        self.last_applied.retain(|id, _| keep.contains(id));
    }

    pub fn len(&self) -> usize {
        self.last_applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_applied.is_empty()
    }
}
