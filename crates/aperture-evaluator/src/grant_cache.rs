//! Per-apply grant memoization.
//!
//! One `apply` call evaluates each distinct permission exactly once,
//! whatever the fan-out of targets sharing it. The cache is scoped to a
//! single call and discarded afterwards; grants are never reused across
//! applies, because the user context may have changed in between.

use std::collections::HashMap;

use aperture_types::PermissionHandle;

use crate::error::Result;
use crate::registry::EvaluatorRegistry;

/// Permission-to-grant memo for one `apply` (or navigation-gate) call.
///
/// Keys are permission handles: equal values of the same runtime type share
/// one evaluation, bounding evaluator invocations to O(distinct
/// permissions) rather than O(targets × permissions-per-target).
#[derive(Default)]
pub struct GrantCache {
    grants: HashMap<PermissionHandle, bool>,
}

impl GrantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `permission` through `registry`, memoized.
    pub fn evaluate(
        &mut self,
        registry: &EvaluatorRegistry,
        permission: &PermissionHandle,
    ) -> Result<bool> {
        if let Some(&granted) = self.grants.get(permission) {
            return Ok(granted);
        }
        let granted = registry.evaluate(permission.get())?;
        self.grants.insert(permission.clone(), granted);
        Ok(granted)
    }

    /// The number of distinct permissions evaluated so far.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
