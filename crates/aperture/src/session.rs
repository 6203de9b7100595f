//! The session seam: where the single per-session context lives.

use std::sync::{Arc, Mutex};

use aperture_engine::AuthorizationContext;

/// Session-scoped store for the single [`AuthorizationContext`].
///
/// The host framework implements this over whatever session state it has;
/// [`InProcessContextStore`] is the reference implementation for tests and
/// single-process hosts.
pub trait ContextStore: Send + Sync {
    /// Stores `context` if the slot is empty. Returns `false` when a
    /// context is already present (the slot is left untouched).
    fn store(&self, context: Arc<AuthorizationContext>) -> bool;

    /// The stored context, if any.
    fn load(&self) -> Option<Arc<AuthorizationContext>>;

    /// Clears the slot, e.g. when the session ends.
    fn clear(&self);
}

/// In-process [`ContextStore`] backed by a mutex slot.
#[derive(Default)]
pub struct InProcessContextStore {
    slot: Mutex<Option<Arc<AuthorizationContext>>>,
}

impl InProcessContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for InProcessContextStore {
    fn store(&self, context: Arc<AuthorizationContext>) -> bool {
        let mut slot = self.slot.lock().expect("context slot poisoned");
        if slot.is_some() {
            return false;
        }
        *slot = Some(context);
        true
    }

    fn load(&self) -> Option<Arc<AuthorizationContext>> {
        self.slot.lock().expect("context slot poisoned").clone()
    }

    fn clear(&self) {
        *self.slot.lock().expect("context slot poisoned") = None;
    }
}
