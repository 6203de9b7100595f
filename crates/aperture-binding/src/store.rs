//! The binding store proper.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use dashmap::DashMap;
use tracing::{debug, warn};

use aperture_types::{BindTarget, PermissionHandle, TargetId, TargetKind};

use crate::error::{BindingError, Result};
use crate::transaction::{BindTransaction, UnbindTransaction};

pub(crate) struct BindingEntry<T: ?Sized> {
    pub(crate) target: Weak<T>,
    pub(crate) permissions: HashSet<PermissionHandle>,
}

pub(crate) struct StoreInner<T: BindTarget + ?Sized> {
    pub(crate) kind: TargetKind,
    /// Lock-striped target map; safe under concurrent structural
    /// iteration from background threads.
    pub(crate) entries: DashMap<TargetId, BindingEntry<T>>,
    /// Guards the two-call fluent API: set on `bind`/`unbind`, cleared by
    /// the terminal call.
    pub(crate) transaction_open: AtomicBool,
}

/// A live bound target as seen by the apply engine.
pub struct BoundTarget<T: BindTarget + ?Sized> {
    pub id: TargetId,
    pub target: Arc<T>,
    pub permissions: Vec<PermissionHandle>,
}

/// Many-to-many target-to-permission store for one target kind.
///
/// Cheap to clone; clones share the same underlying maps.
pub struct BindingStore<T: BindTarget + ?Sized> {
    pub(crate) inner: Arc<StoreInner<T>>,
}

impl<T: BindTarget + ?Sized> Clone for BindingStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: BindTarget + ?Sized> BindingStore<T> {
    pub fn new(kind: TargetKind) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                kind,
                entries: DashMap::new(),
                transaction_open: AtomicBool::new(false),
            }),
        }
    }

    /// The target kind this store manages.
    pub fn kind(&self) -> TargetKind {
        self.inner.kind
    }

    /// Opens a bind transaction for `targets`.
    ///
    /// # Errors
    ///
    /// - [`BindingError::EmptyTargets`] for an empty target list.
    /// - [`BindingError::UnfinishedTransaction`] if an earlier transaction
    ///   on this store was never completed.
    pub fn bind(&self, targets: Vec<Arc<T>>) -> Result<BindTransaction<T>> {
        if targets.is_empty() {
            return Err(BindingError::EmptyTargets);
        }
        self.open_transaction()?;
        Ok(BindTransaction::new(self.clone(), targets))
    }

    /// Opens an unbind transaction for `targets`.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`bind`](Self::bind).
    pub fn unbind(&self, targets: Vec<Arc<T>>) -> Result<UnbindTransaction<T>> {
        if targets.is_empty() {
            return Err(BindingError::EmptyTargets);
        }
        self.open_transaction()?;
        Ok(UnbindTransaction::new(self.clone(), targets))
    }

    /// Read-only snapshot of the permissions bound to `target`.
    ///
    /// Empty for unknown targets: zero bound permissions means
    /// unrestricted.
    pub fn permissions_of(&self, target: TargetId) -> Vec<PermissionHandle> {
        self.inner
            .entries
            .get(&target)
            .map(|entry| entry.permissions.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `target` currently has a binding entry.
    pub fn contains(&self, target: TargetId) -> bool {
        self.inner.entries.contains_key(&target)
    }

    /// Ids of all currently bound targets, including ones whose weak
    /// target may have died since.
    pub fn bound_ids(&self) -> Vec<TargetId> {
        self.inner.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// Looks up a single live bound target.
    ///
    /// Returns `None` for unknown targets; a known entry whose target has
    /// been dropped is removed and also reported as `None`.
    pub fn live_target(&self, target: TargetId) -> Option<BoundTarget<T>> {
        let upgraded = {
            let entry = self.inner.entries.get(&target)?;
            entry.target.upgrade().map(|live| BoundTarget {
                id: target,
                target: live,
                permissions: entry.permissions.iter().cloned().collect(),
            })
        };
        if upgraded.is_none() {
            self.inner.entries.remove(&target);
            warn!(kind = %self.inner.kind, %target, "pruned dropped target");
        }
        upgraded
    }

    /// Snapshot of all live bound targets; dead entries are pruned.
    pub fn live_targets(&self) -> Vec<BoundTarget<T>> {
        let mut live = Vec::new();
        let mut dead = Vec::new();
        for entry in self.inner.entries.iter() {
            match entry.target.upgrade() {
                Some(target) => live.push(BoundTarget {
                    id: *entry.key(),
                    target,
                    permissions: entry.permissions.iter().cloned().collect(),
                }),
                None => dead.push(*entry.key()),
            }
        }
        self.remove_dead(&dead);
        live
    }

    /// Removes entries whose weak target has been dropped.
    ///
    /// Returns the number of pruned entries.
    pub fn prune(&self) -> usize {
        let dead: Vec<TargetId> = self
            .inner
            .entries
            .iter()
            .filter(|entry| entry.target.upgrade().is_none())
            .map(|entry| *entry.key())
            .collect();
        self.remove_dead(&dead);
        dead.len()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    fn remove_dead(&self, dead: &[TargetId]) {
        for id in dead {
            self.inner.entries.remove(id);
        }
        if !dead.is_empty() {
            debug!(
                kind = %self.inner.kind,
                pruned = dead.len(),
                "pruned dropped targets"
            );
        }
    }

    pub(crate) fn open_transaction(&self) -> Result<()> {
        self.inner
            .transaction_open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BindingError::UnfinishedTransaction {
                kind: self.inner.kind,
            })?;
        Ok(())
    }

    pub(crate) fn close_transaction(&self) {
        self.inner.transaction_open.store(false, Ordering::Release);
    }
}

impl<T: BindTarget + ?Sized> std::fmt::Debug for BindingStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingStore")
            .field("kind", &self.inner.kind)
            .field("bound", &self.inner.entries.len())
            .finish()
    }
}
