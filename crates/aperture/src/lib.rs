//! # Aperture
//!
//! Permission-evaluation and visibility engine for component-tree UIs.
//!
//! Aperture decides, for a runtime permission object, whether the current
//! user context grants it, and propagates the decision as visibility on
//! components, navigability on views, and row-level filters on data
//! providers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Aperture                             │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐ │
//! │  │ Registry │ → │ Bindings │ → │  Apply   │ → │   Data    │ │
//! │  │(resolve) │   │(weak map)│   │(commit)  │   │ (filter)  │ │
//! │  └──────────┘   └──────────┘   └──────────┘   └───────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use aperture::{start, ConfigLoader, EvaluatorSet, InProcessContextStore};
//!
//! // Register one evaluator per permission type, once per session.
//! let evaluators = EvaluatorSet::new()
//!     .with::<RoleRequired, _>(move |role: &RoleRequired| user.has_role(role.0))?;
//!
//! let store = InProcessContextStore::new();
//! let config = ConfigLoader::new().load_or_default();
//! let authorization = start(evaluators, &config, &store)?;
//!
//! // Bind UI elements to the permissions they require.
//! authorization
//!     .bind_components(vec![delete_button.clone()])?
//!     .to(vec![RoleRequired("admin").into()])?;
//!
//! // Evaluate and commit visibility; navigation and data providers
//! // re-run automatically.
//! authorization.apply_all()?;
//! ```
//!
//! # Modules
//!
//! - **Facade**: [`start`], [`Authorization`] - the application surface
//! - **Session**: [`ContextStore`], [`InProcessContextStore`]
//! - **Configuration**: [`EngineConfig`], [`ConfigLoader`]

pub mod authorization;
pub mod config;
pub mod error;
pub mod session;

pub use authorization::{Authorization, ComponentReverter, ComponentUnbind, ViewReverter, start};
pub use config::{Audit, ConfigLoader, EngineConfig};
pub use error::{ApertureError, Result};
pub use session::{ContextStore, InProcessContextStore};

// Re-export core types
pub use aperture_types::{
    BindTarget, Component, ComponentRef, DynEq, DynHash, Permission, PermissionHandle, Refreshable,
    TargetId, TargetKind, View, ViewRef,
};

// Re-export evaluator surface
pub use aperture_evaluator::{
    Evaluator, EvaluatorError, EvaluatorRegistry, EvaluatorSet, GrantCache, PermissionEvaluator,
    ResolutionPolicy, evaluator_fn,
};

// Re-export binding surface
pub use aperture_binding::{BindTransaction, BindingError, BindingStore, Reverter, UnbindTransaction};

// Re-export engine surface
pub use aperture_engine::{AuthorizationContext, EngineError, NavigationFacade, VisibilityTracker};

// Re-export data surface
pub use aperture_data::{
    AuthorizedProvider, DataProvider, FilterableProvider, ItemFilter, ListProvider, ProviderError,
    Query, authorize_in_memory,
};
