//! The embedding-application surface.

use std::sync::Arc;

use tracing::info;

use aperture_binding::{BindTransaction, Reverter, UnbindTransaction};
use aperture_data::{AuthorizedProvider, DataProvider, FilterableProvider, ListProvider, authorize_in_memory};
use aperture_engine::{AuthorizationContext, NavigationFacade};
use aperture_evaluator::{EvaluatorRegistry, EvaluatorSet};
use aperture_types::{
    Component, ComponentRef, Permission, PermissionHandle, Refreshable, TargetId, View, ViewRef,
};

use crate::config::EngineConfig;
use crate::error::{ApertureError, Result};
use crate::session::ContextStore;

// ============================================================================
// start
// ============================================================================

/// Builds the registry, creates the session's [`AuthorizationContext`], and
/// stashes it in `store`.
///
/// Called exactly once when the hosting session initializes.
///
/// # Errors
///
/// - [`ApertureError::AlreadyStarted`] if `store` already holds a context.
/// - Evaluator configuration errors from registry construction.
pub fn start(
    evaluators: EvaluatorSet,
    config: &EngineConfig,
    store: &dyn ContextStore,
) -> Result<Authorization> {
    if store.load().is_some() {
        return Err(ApertureError::AlreadyStarted);
    }

    let mut registry = EvaluatorRegistry::build(evaluators, config.resolution)?;
    if !config.audit.enabled {
        registry = registry.without_audit();
    }

    let mut context = AuthorizationContext::new(registry);
    if !config.audit.enabled {
        context = context.without_audit();
    }
    let context = Arc::new(context);

    if !store.store(Arc::clone(&context)) {
        return Err(ApertureError::AlreadyStarted);
    }

    info!(policy = ?config.resolution, "authorization started");
    Ok(Authorization { context })
}

// ============================================================================
// Authorization
// ============================================================================

/// Handle over the session's authorization context.
pub struct Authorization {
    context: Arc<AuthorizationContext>,
}

impl Authorization {
    /// Reattaches to a previously started session.
    pub fn from_session(store: &dyn ContextStore) -> Option<Self> {
        store.load().map(|context| Self { context })
    }

    /// The underlying context, for host adapters that need direct access.
    pub fn context(&self) -> &Arc<AuthorizationContext> {
        &self.context
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Opens a bind transaction for `components`; complete with
    /// `.to(permissions)`.
    pub fn bind_components(
        &self,
        components: Vec<ComponentRef>,
    ) -> Result<BindTransaction<dyn Component>> {
        Ok(self.context.components().bind(components)?)
    }

    /// Opens an unbind transaction for `components`; complete with
    /// `.from(permissions)` or `.from_all()`.
    pub fn unbind_components(&self, components: Vec<ComponentRef>) -> Result<ComponentUnbind<'_>> {
        let transaction = self
            .context
            .components()
            .unbind(components.clone())?;
        Ok(ComponentUnbind {
            context: &self.context,
            transaction,
            components,
        })
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Opens a bind transaction for `views`.
    pub fn bind_views(&self, views: Vec<ViewRef>) -> Result<BindTransaction<dyn View>> {
        Ok(self.context.views().bind(views)?)
    }

    /// Opens an unbind transaction for `views`.
    pub fn unbind_views(&self, views: Vec<ViewRef>) -> Result<UnbindTransaction<dyn View>> {
        Ok(self.context.views().unbind(views)?)
    }

    // ------------------------------------------------------------------
    // Apply
    // ------------------------------------------------------------------

    /// Re-evaluates and commits visibility for the given components.
    pub fn apply(&self, components: &[TargetId]) -> Result<()> {
        Ok(self.context.apply(components)?)
    }

    /// Re-evaluates and commits visibility for every bound component.
    pub fn apply_all(&self) -> Result<()> {
        Ok(self.context.apply_all()?)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Installs the host navigation facade used for post-apply replays.
    pub fn set_navigation_facade(&self, facade: Arc<dyn NavigationFacade>) {
        self.context.set_navigation_facade(facade);
    }

    /// Removes the navigation facade.
    pub fn clear_navigation_facade(&self) {
        self.context.clear_navigation_facade();
    }

    /// Whether navigating to the given bound view is currently permitted;
    /// the host's before-navigation listener consults this.
    pub fn navigation_allowed(&self, view: TargetId) -> Result<bool> {
        Ok(self.context.navigation_allowed(view)?)
    }

    // ------------------------------------------------------------------
    // Data providers
    // ------------------------------------------------------------------

    /// Authorizes an in-memory source in place and registers it for
    /// post-apply refresh under `component`.
    pub fn bind_data_in_memory<T: Permission + Clone>(
        &self,
        component: TargetId,
        provider: &Arc<ListProvider<T>>,
    ) -> Result<()> {
        authorize_in_memory(provider, self.context.registry())?;
        let hook: Arc<dyn Refreshable> = provider.clone();
        self.context
            .register_provider(component, Arc::downgrade(&hook));
        Ok(())
    }

    /// Wraps a paged/lazy/remote source and registers the wrapper for
    /// post-apply refresh under `component`.
    pub fn bind_data<T: Permission + Clone>(
        &self,
        component: TargetId,
        provider: Arc<dyn DataProvider<T>>,
    ) -> Result<Arc<AuthorizedProvider<T>>> {
        let wrapped = AuthorizedProvider::wrap(provider, self.context.registry())?;
        self.register_wrapped(component, &wrapped);
        Ok(wrapped)
    }

    /// Wraps a source with native filter support; the evaluator-derived
    /// filter is passed down and integrity-checked.
    pub fn bind_data_filterable<T: Permission + Clone>(
        &self,
        component: TargetId,
        provider: Arc<dyn FilterableProvider<T>>,
    ) -> Result<Arc<AuthorizedProvider<T>>> {
        let wrapped = AuthorizedProvider::wrap_filterable(provider, self.context.registry())?;
        self.register_wrapped(component, &wrapped);
        Ok(wrapped)
    }

    /// Stops refreshing the provider bound under `component`.
    pub fn unbind_data(&self, component: TargetId) {
        self.context.unregister_provider(component);
    }

    fn register_wrapped<T: Permission + Clone>(
        &self,
        component: TargetId,
        wrapped: &Arc<AuthorizedProvider<T>>,
    ) {
        let hook: Arc<dyn Refreshable> = wrapped.clone();
        self.context
            .register_provider(component, Arc::downgrade(&hook));
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorization")
            .field("context", &self.context)
            .finish()
    }
}

// ============================================================================
// Component unbind with visibility reset
// ============================================================================

/// Unbind transaction for components.
///
/// `from_all` additionally resets each component to the unrestricted
/// state: no bound permissions means always visible, and the engine stops
/// tracking it.
#[must_use = "unbind_components() opens a transaction that must be completed with from() or from_all()"]
pub struct ComponentUnbind<'a> {
    context: &'a Arc<AuthorizationContext>,
    transaction: UnbindTransaction<dyn Component>,
    components: Vec<ComponentRef>,
}

impl ComponentUnbind<'_> {
    /// Set-subtracts `permissions` from each component's set.
    pub fn from(self, permissions: Vec<PermissionHandle>) -> Result<()> {
        Ok(self.transaction.from(permissions)?)
    }

    /// Removes each component's binding entirely and resets it to visible.
    pub fn from_all(self) -> Vec<TargetId> {
        let removed = self.transaction.from_all();
        for component in &self.components {
            self.context.reset_component(component);
        }
        removed
    }
}

/// Convenience re-export of the reverter type returned by bind
/// transactions.
pub type ComponentReverter = Reverter<dyn Component>;

/// Reverter for view bind transactions.
pub type ViewReverter = Reverter<dyn View>;
