//! The per-session authorization context and the apply algorithm.

use std::sync::{Arc, Mutex, Weak};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use aperture_binding::BindingStore;
use aperture_evaluator::{EvaluatorRegistry, GrantCache};
use aperture_types::{Component, PermissionHandle, Refreshable, TargetId, TargetKind, View};

use crate::error::{EngineError, Result};
use crate::navigation::NavigationFacade;
use crate::tracker::VisibilityTracker;

/// Process state for one user session: the registry, both binding stores,
/// the visibility tracker, registered data-provider refresh hooks, and the
/// optional navigation facade.
///
/// Created exactly once when the session starts and shared by reference
/// into every engine call; there is no process-global state.
pub struct AuthorizationContext {
    registry: EvaluatorRegistry,
    components: BindingStore<dyn Component>,
    views: BindingStore<dyn View>,
    tracker: VisibilityTracker,
    /// Weakly-held refresh hooks for wrapped data providers; a provider
    /// dropped by the host is pruned, never refreshed.
    providers: DashMap<TargetId, Weak<dyn Refreshable>>,
    navigation: Mutex<Option<Arc<dyn NavigationFacade>>>,
    audit_enabled: bool,
}

impl AuthorizationContext {
    /// Creates the context around a built registry.
    pub fn new(registry: EvaluatorRegistry) -> Self {
        Self {
            registry,
            components: BindingStore::new(TargetKind::Component),
            views: BindingStore::new(TargetKind::View),
            tracker: VisibilityTracker::new(),
            providers: DashMap::new(),
            navigation: Mutex::new(None),
            audit_enabled: true,
        }
    }

    /// Disables visibility audit logging (for tests).
    #[must_use]
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    /// The evaluator registry of this context.
    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    /// The component binding store.
    pub fn components(&self) -> &BindingStore<dyn Component> {
        &self.components
    }

    /// The view binding store.
    pub fn views(&self) -> &BindingStore<dyn View> {
        &self.views
    }

    /// The visibility tracker.
    pub fn tracker(&self) -> &VisibilityTracker {
        &self.tracker
    }

    // ------------------------------------------------------------------
    // Apply
    // ------------------------------------------------------------------

    /// Evaluates and commits visibility for the given bound components,
    /// then replays navigation and refreshes data providers.
    ///
    /// Unknown or already-dropped targets are skipped (and dead entries
    /// pruned); they are not an error.
    ///
    /// # Errors
    ///
    /// - Evaluator configuration errors ([`EngineError::Evaluator`]).
    /// - [`EngineError::ExternalVisibilityMutation`] if a bound component's
    ///   visibility was changed outside the engine since the last apply.
    ///   Targets committed before the offending one stay committed; a
    ///   corrected re-apply converges.
    pub fn apply(&self, targets: &[TargetId]) -> Result<()> {
        let batch: Vec<_> = targets
            .iter()
            .filter_map(|&id| self.components.live_target(id))
            .collect();

        // Read phase: every distinct permission is decided before any
        // visibility is written, so the whole batch sees one snapshot.
        let mut grants = GrantCache::new();
        for bound in &batch {
            for permission in &bound.permissions {
                grants.evaluate(&self.registry, permission)?;
            }
        }

        // Write phase.
        for bound in &batch {
            let visible = self.fold_grants(&mut grants, &bound.permissions)?;

            if let Some(expected) = self.tracker.last_applied(bound.id) {
                let found = bound.target.is_visible();
                if found != expected {
                    return Err(EngineError::ExternalVisibilityMutation {
                        target: bound.id,
                        expected,
                        found,
                    });
                }
            }

            bound.target.set_visible(visible);
            self.tracker.record(bound.id, visible);

            if self.audit_enabled {
                if visible {
                    info!(target = %bound.id, "component visible");
                } else {
                    info!(target = %bound.id, "component hidden");
                }
            }
        }

        debug!(
            targets = batch.len(),
            distinct_permissions = grants.len(),
            "apply committed"
        );

        // Side effects run for subset applies too: a visibility change can
        // invalidate the current view or any filtered item set.
        self.replay_navigation();
        self.refresh_providers();

        Ok(())
    }

    /// [`apply`](Self::apply) over every currently bound component.
    pub fn apply_all(&self) -> Result<()> {
        self.views.prune();
        self.components.prune();
        let bound = self.components.bound_ids();
        self.tracker.retain(&bound);
        self.apply(&bound)
    }

    /// Resets a fully-unbound component to the unrestricted state: visible,
    /// with no tracking entry.
    pub fn reset_component(&self, component: &Arc<dyn Component>) {
        component.set_visible(true);
        self.tracker.clear(component.target_id());
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Installs the host navigation facade.
    pub fn set_navigation_facade(&self, facade: Arc<dyn NavigationFacade>) {
        *self.lock_navigation() = Some(facade);
    }

    /// Removes the navigation facade; subsequent applies skip the replay.
    pub fn clear_navigation_facade(&self) {
        *self.lock_navigation() = None;
    }

    /// Whether navigating to the given bound view is currently permitted.
    ///
    /// Consulted by the host's before-navigation listener. A view with no
    /// bound permissions is unrestricted.
    pub fn navigation_allowed(&self, view: TargetId) -> Result<bool> {
        let permissions = self.views.permissions_of(view);
        let mut grants = GrantCache::new();
        let allowed = self.fold_grants(&mut grants, &permissions)?;

        if self.audit_enabled && !allowed {
            warn!(target = %view, "navigation denied");
        }

        Ok(allowed)
    }

    fn replay_navigation(&self) {
        let facade = self.lock_navigation().clone();
        if let Some(facade) = facade {
            if let Some(location) = facade.current_location() {
                debug!(%location, "replaying navigation");
                facade.navigate_to(&location);
            }
        }
    }

    fn lock_navigation(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn NavigationFacade>>> {
        self.navigation
            .lock()
            .expect("navigation facade lock poisoned")
    }

    // ------------------------------------------------------------------
    // Data providers
    // ------------------------------------------------------------------

    /// Registers a refresh hook for the wrapped data provider shown by
    /// `target`. The hook is held weakly.
    pub fn register_provider(&self, target: TargetId, provider: Weak<dyn Refreshable>) {
        self.providers.insert(target, provider);
    }

    /// Removes the refresh hook for `target`.
    pub fn unregister_provider(&self, target: TargetId) {
        self.providers.remove(&target);
    }

    /// The number of registered (possibly dead) provider hooks.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    fn refresh_providers(&self) {
        let mut dead = Vec::new();
        let mut refreshed = 0usize;
        for entry in self.providers.iter() {
            match entry.value().upgrade() {
                Some(provider) => {
                    provider.refresh();
                    refreshed += 1;
                }
                None => dead.push(*entry.key()),
            }
        }
        for id in &dead {
            self.providers.remove(id);
        }
        if refreshed > 0 || !dead.is_empty() {
            debug!(refreshed, pruned = dead.len(), "data providers refreshed");
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// AND-fold over cached grants; the empty set is granted.
    fn fold_grants(
        &self,
        grants: &mut GrantCache,
        permissions: &[PermissionHandle],
    ) -> Result<bool> {
        let mut granted = true;
        for permission in permissions {
            granted &= grants.evaluate(&self.registry, permission)?;
        }
        Ok(granted)
    }
}

impl std::fmt::Debug for AuthorizationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationContext")
            .field("registry", &self.registry)
            .field("components", &self.components)
            .field("views", &self.views)
            .field("providers", &self.providers.len())
            .finish()
    }
}
