//! The evaluator registry: exact-type lookup, generalization-aware
//! resolution, conflict detection, and derived-lookup memoization.
//!
//! Resolution order for a permission value:
//! 1. Memo hit for the value's exact runtime type.
//! 2. Exact-type map hit.
//! 3. Breadth-first scan of the value's generalization closure; every
//!    reachable general value whose type has a registered evaluator is a
//!    compatible match, and BFS depth is the structural-distance analog.
//!
//! The resolved delegation path is memoized against the exact runtime type,
//! so repeated lookups for narrowed permission types are O(1) after the
//! first resolution.

use std::any::TypeId;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use aperture_types::{DynEq, Permission};

use crate::error::{EvaluatorError, Result};
use crate::evaluator::{Evaluator, EvaluatorSet};

// ============================================================================
// Resolution policy
// ============================================================================

/// How the registry treats a permission type compatible with more than one
/// registered evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPolicy {
    /// Any count of compatible evaluators other than exactly one is a
    /// configuration error. The safer default: ambiguity is never resolved
    /// silently.
    #[default]
    Strict,

    /// Pick the compatible evaluator nearest in generalization distance,
    /// declaration order breaking depth ties. Explicit opt-in.
    Nearest,
}

// ============================================================================
// Resolved evaluator
// ============================================================================

/// An evaluator resolved for a specific permission type, together with the
/// delegation path from a value of that type to the value the target
/// evaluator accepts.
///
/// For an exact-type match the path is empty. For a narrowed permission the
/// resolved evaluator reports the *target's* permission type: resolving a
/// narrowing type yields a delegate to the general type's evaluator.
pub struct ResolvedEvaluator {
    target: Arc<dyn Evaluator>,
    path: Vec<usize>,
}

impl std::fmt::Debug for ResolvedEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedEvaluator")
            .field("permission_type_name", &self.target.permission_type_name())
            .field("path", &self.path)
            .finish()
    }
}

impl ResolvedEvaluator {
    /// The exact permission type of the evaluator this resolution delegates
    /// to.
    pub fn permission_type(&self) -> TypeId {
        self.target.permission_type()
    }

    /// The name of that permission type.
    pub fn permission_type_name(&self) -> &'static str {
        self.target.permission_type_name()
    }

    /// Whether this resolution delegates through the generalization
    /// relation rather than matching exactly.
    pub fn is_delegated(&self) -> bool {
        !self.path.is_empty()
    }

    /// Decides `permission`, projecting it along the resolved path first.
    pub fn grants(&self, permission: &dyn Permission) -> Result<bool> {
        let mut current = permission;
        for &index in &self.path {
            let general = current.generalizes();
            current = *general.get(index).ok_or(EvaluatorError::GeneralizationMismatch {
                type_name: permission.type_name(),
            })?;
        }
        self.target.grants(current)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry mapping permission types to evaluators.
///
/// Built once per authorization context and immutable thereafter, apart
/// from the internal derived-lookup memo.
pub struct EvaluatorRegistry {
    /// Exact permission type to its registered evaluator.
    exact: std::collections::HashMap<TypeId, Arc<dyn Evaluator>>,

    /// Derived-lookup memo: exact runtime type of a permission value to the
    /// resolution computed for it. Lock-striped; background threads may
    /// resolve concurrently with UI-thread applies.
    resolved: DashMap<TypeId, Arc<ResolvedEvaluator>>,

    policy: ResolutionPolicy,

    /// Whether grant decisions are logged.
    audit_enabled: bool,
}

impl EvaluatorRegistry {
    /// Builds the registry from a collected evaluator set.
    ///
    /// # Errors
    ///
    /// [`EvaluatorError::DuplicateEvaluator`] if two evaluators share an
    /// exact permission type. Construction-time fatal: the application
    /// wired its evaluators incorrectly.
    pub fn build(evaluators: EvaluatorSet, policy: ResolutionPolicy) -> Result<Self> {
        let mut exact = std::collections::HashMap::new();
        for evaluator in evaluators.into_evaluators() {
            let type_name = evaluator.permission_type_name();
            if exact.insert(evaluator.permission_type(), evaluator).is_some() {
                return Err(EvaluatorError::DuplicateEvaluator { type_name });
            }
        }

        debug!(registered = exact.len(), ?policy, "evaluator registry built");

        Ok(Self {
            exact,
            resolved: DashMap::new(),
            policy,
            audit_enabled: true,
        })
    }

    /// Disables grant/deny audit logging (for tests).
    #[must_use]
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    /// The number of registered evaluators.
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// Names of the registered permission types, for diagnostics.
    pub fn registered_type_names(&self) -> Vec<&'static str> {
        self.exact
            .values()
            .map(|evaluator| evaluator.permission_type_name())
            .collect()
    }

    /// Resolves the evaluator responsible for `permission`.
    ///
    /// # Errors
    ///
    /// - [`EvaluatorError::NoEvaluatorFound`] if nothing compatible is
    ///   registered.
    /// - [`EvaluatorError::ConflictingEvaluators`] under the strict policy
    ///   if more than one distinct evaluator is compatible.
    pub fn resolve(&self, permission: &dyn Permission) -> Result<Arc<ResolvedEvaluator>> {
        let type_id = permission.as_any().type_id();
        if let Some(hit) = self.resolved.get(&type_id) {
            return Ok(Arc::clone(&hit));
        }

        let resolution = self.scan(permission)?;
        // Concurrent resolutions of the same type compute identical paths;
        // first insert wins.
        let resolution = self
            .resolved
            .entry(type_id)
            .or_insert(resolution)
            .clone();
        Ok(resolution)
    }

    /// Resolves an evaluator registered for exactly the type `P`.
    ///
    /// The data-provider path has no permission value in hand at wrap time,
    /// so only exact-type registration can satisfy it.
    pub fn resolve_exact<P: Permission>(&self) -> Result<Arc<dyn Evaluator>> {
        self.exact
            .get(&TypeId::of::<P>())
            .cloned()
            .ok_or(EvaluatorError::NoEvaluatorFound {
                type_name: std::any::type_name::<P>(),
            })
    }

    /// Resolves and decides `permission` in one step, with audit logging.
    pub fn evaluate(&self, permission: &dyn Permission) -> Result<bool> {
        let resolved = self.resolve(permission)?;
        let granted = resolved.grants(permission)?;

        if self.audit_enabled {
            if granted {
                info!(
                    permission = ?permission,
                    evaluator = resolved.permission_type_name(),
                    "permission granted"
                );
            } else {
                warn!(
                    permission = ?permission,
                    evaluator = resolved.permission_type_name(),
                    "permission denied"
                );
            }
        }

        Ok(granted)
    }

    /// Full scan for a type with no memo entry.
    fn scan<'p>(&self, permission: &'p dyn Permission) -> Result<Arc<ResolvedEvaluator>> {
        let type_id = permission.as_any().type_id();

        if let Some(evaluator) = self.exact.get(&type_id) {
            debug!(
                permission_type = permission.type_name(),
                "resolved by exact match"
            );
            return Ok(Arc::new(ResolvedEvaluator {
                target: Arc::clone(evaluator),
                path: Vec::new(),
            }));
        }

        // BFS over the generalization closure. Depth-first order would
        // misreport structural distance for diamond-shaped relations.
        let mut queue: VecDeque<(&'p dyn Permission, Vec<usize>)> = VecDeque::new();
        let mut visited: HashSet<TypeId> = HashSet::new();
        visited.insert(type_id);
        queue.push_back((permission, Vec::new()));

        // All compatible matches in BFS order; strictness needs the full
        // set, not just the first.
        let mut matches: Vec<(Vec<usize>, Arc<dyn Evaluator>)> = Vec::new();

        while let Some((current, path)) = queue.pop_front() {
            for (index, general) in current.generalizes().into_iter().enumerate() {
                let general_type = general.as_any().type_id();
                if !visited.insert(general_type) {
                    continue;
                }
                let mut general_path = path.clone();
                general_path.push(index);

                if let Some(evaluator) = self.exact.get(&general_type) {
                    matches.push((general_path.clone(), Arc::clone(evaluator)));
                }
                queue.push_back((general, general_path));
            }
        }

        let (path, target) = match (self.policy, matches.len()) {
            (_, 0) => {
                return Err(EvaluatorError::NoEvaluatorFound {
                    type_name: permission.type_name(),
                });
            }
            (ResolutionPolicy::Strict, 1) | (ResolutionPolicy::Nearest, _) => {
                // BFS order: shallowest depth first, declaration order
                // within a depth.
                matches.swap_remove(0)
            }
            (ResolutionPolicy::Strict, _) => {
                return Err(EvaluatorError::ConflictingEvaluators {
                    type_name: permission.type_name(),
                    candidates: matches
                        .iter()
                        .map(|(_, evaluator)| evaluator.permission_type_name())
                        .collect(),
                });
            }
        };

        debug!(
            permission_type = permission.type_name(),
            delegate = target.permission_type_name(),
            distance = path.len(),
            "resolved by generalization"
        );

        Ok(Arc::new(ResolvedEvaluator { target, path }))
    }
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("registered", &self.exact.len())
            .field("memoized", &self.resolved.len())
            .field("policy", &self.policy)
            .finish()
    }
}
