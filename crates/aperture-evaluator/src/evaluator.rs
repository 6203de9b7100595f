//! Evaluator traits and the registration set.
//!
//! Applications implement [`PermissionEvaluator`] for each permission type
//! they use (or pass a closure) and collect them in an [`EvaluatorSet`] for
//! `start`. The registry works with the type-erased [`Evaluator`] object.

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

use aperture_types::{DynEq, Permission};

use crate::error::{EvaluatorError, Result};

// ============================================================================
// Typed evaluators
// ============================================================================

/// Decision function for one permission type.
///
/// Evaluators are constructed before `start`, immutable thereafter, and are
/// expected to be fast in-process predicate checks. An evaluator that needs
/// I/O must cache outside the engine.
pub trait PermissionEvaluator<P: Permission>: Send + Sync {
    /// Returns whether the current user context grants `permission`.
    fn grants(&self, permission: &P) -> bool;
}

impl<P: Permission, F> PermissionEvaluator<P> for F
where
    F: Fn(&P) -> bool + Send + Sync,
{
    fn grants(&self, permission: &P) -> bool {
        self(permission)
    }
}

// ============================================================================
// Type erasure
// ============================================================================

/// Type-erased evaluator as stored by the registry.
pub trait Evaluator: Send + Sync {
    /// The exact permission type this evaluator decides.
    fn permission_type(&self) -> TypeId;

    /// The name of that permission type, for diagnostics.
    fn permission_type_name(&self) -> &'static str;

    /// Decides a type-erased permission value.
    ///
    /// # Errors
    ///
    /// [`EvaluatorError::GeneralizationMismatch`] if the value is not of
    /// this evaluator's permission type.
    fn grants(&self, permission: &dyn Permission) -> Result<bool>;
}

struct Erased<P, E> {
    inner: E,
    _permission: PhantomData<fn(&P)>,
}

impl<P: Permission, E: PermissionEvaluator<P>> Evaluator for Erased<P, E> {
    fn permission_type(&self) -> TypeId {
        TypeId::of::<P>()
    }

    fn permission_type_name(&self) -> &'static str {
        std::any::type_name::<P>()
    }

    fn grants(&self, permission: &dyn Permission) -> Result<bool> {
        let permission = permission.as_any().downcast_ref::<P>().ok_or(
            EvaluatorError::GeneralizationMismatch {
                type_name: permission.type_name(),
            },
        )?;
        Ok(self.inner.grants(permission))
    }
}

/// Erases a typed evaluator (or closure) into a registry-ready object.
pub fn evaluator_fn<P, E>(evaluator: E) -> Arc<dyn Evaluator>
where
    P: Permission,
    E: PermissionEvaluator<P> + 'static,
{
    Arc::new(Erased {
        inner: evaluator,
        _permission: PhantomData,
    })
}

// ============================================================================
// EvaluatorSet
// ============================================================================

/// Evaluators collected by the embedding application for `start`.
///
/// Duplicate exact-type registration is rejected here, before the registry
/// is ever built.
#[derive(Default)]
pub struct EvaluatorSet {
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl EvaluatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an evaluator for permission type `P`.
    ///
    /// # Errors
    ///
    /// [`EvaluatorError::DuplicateEvaluator`] if an evaluator for `P` is
    /// already in the set.
    pub fn with<P, E>(self, evaluator: E) -> Result<Self>
    where
        P: Permission,
        E: PermissionEvaluator<P> + 'static,
    {
        self.with_erased(evaluator_fn::<P, E>(evaluator))
    }

    /// Adds an already-erased evaluator.
    pub fn with_erased(mut self, evaluator: Arc<dyn Evaluator>) -> Result<Self> {
        if self
            .evaluators
            .iter()
            .any(|existing| existing.permission_type() == evaluator.permission_type())
        {
            return Err(EvaluatorError::DuplicateEvaluator {
                type_name: evaluator.permission_type_name(),
            });
        }
        self.evaluators.push(evaluator);
        Ok(self)
    }

    /// Consumes the set into its evaluators.
    pub fn into_evaluators(self) -> Vec<Arc<dyn Evaluator>> {
        self.evaluators
    }

    /// Builds a set without the duplicate guard, to exercise the registry's
    /// own construction-time check.
    #[cfg(test)]
    pub(crate) fn from_evaluators_unchecked(evaluators: Vec<Arc<dyn Evaluator>>) -> Self {
        Self { evaluators }
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}
