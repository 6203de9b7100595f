//! Permission values and the shared handle used to key binding sets.
//!
//! A permission is any application value type. Identity is by runtime type
//! plus the value's own equality; the engine never interprets the value
//! itself. Rust has no class hierarchy, so the "derived type" relation of
//! reflective frameworks is declared explicitly: a permission value may
//! expose the more general permission values it narrows via
//! [`Permission::generalizes`].

use std::any::Any;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ============================================================================
// Dyn-safe equality and hashing
// ============================================================================

/// Object-safe equality over type-erased values.
///
/// Implemented automatically for every `'static` type that is `Eq`.
pub trait DynEq {
    /// Returns `self` as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns whether `other` is a value of the same concrete type that
    /// compares equal to `self`.
    fn dyn_eq(&self, other: &dyn Any) -> bool;
}

impl<T: Any + Eq> DynEq for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }
}

/// Object-safe hashing over type-erased values.
///
/// Implemented automatically for every `'static` type that is `Hash`.
pub trait DynHash {
    /// Feeds the value into `state`.
    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<T: Any + Hash> DynHash for T {
    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }
}

// ============================================================================
// Permission
// ============================================================================

/// An opaque application-defined value representing a grantable right.
///
/// Implementations are one line for plain value types:
///
/// ```
/// use aperture_types::Permission;
///
/// #[derive(Debug, PartialEq, Eq, Hash)]
/// struct RoleRequired(String);
///
/// impl Permission for RoleRequired {}
/// ```
///
/// A permission that narrows a more general one overrides
/// [`generalizes`](Permission::generalizes) and exposes the embedded general
/// value, nearest first. The registry resolves evaluators along this
/// relation, so the set and order of generalizations must be constant for a
/// given type: resolution paths are memoized per exact runtime type.
pub trait Permission: DynEq + DynHash + Debug + Send + Sync + 'static {
    /// More general permission values this one narrows, nearest first.
    ///
    /// The default is the empty relation: the permission stands alone and
    /// only an exact-type evaluator can decide it.
    fn generalizes(&self) -> Vec<&dyn Permission> {
        Vec::new()
    }

    /// The name of the concrete permission type, for diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// ============================================================================
// PermissionHandle
// ============================================================================

/// Shared, map-key-safe handle to a permission value.
///
/// Equality and hashing delegate to the underlying value's own `Eq`/`Hash`,
/// scoped by its concrete runtime type, so two handles are equal exactly
/// when they hold equal values of the same type. Cloning is cheap.
#[derive(Clone)]
pub struct PermissionHandle(Arc<dyn Permission>);

impl PermissionHandle {
    /// Wraps a permission value.
    pub fn new<P: Permission>(permission: P) -> Self {
        Self(Arc::new(permission))
    }

    /// Wraps an already-shared permission.
    pub fn from_arc(permission: Arc<dyn Permission>) -> Self {
        Self(permission)
    }

    /// Returns the underlying permission value.
    pub fn get(&self) -> &dyn Permission {
        self.0.as_ref()
    }

    /// Returns the `TypeId` of the concrete permission type.
    pub fn type_id(&self) -> std::any::TypeId {
        self.0.as_any().type_id()
    }

    /// Returns the name of the concrete permission type.
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl PartialEq for PermissionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(other.0.as_any())
    }
}

impl Eq for PermissionHandle {}

impl Hash for PermissionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id().hash(state);
        self.0.dyn_hash(state);
    }
}

impl Debug for PermissionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl<P: Permission> From<P> for PermissionHandle {
    fn from(permission: P) -> Self {
        Self::new(permission)
    }
}
