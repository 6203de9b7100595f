//! Fluent bind/unbind transactions and the single-use reverter.

use std::sync::Arc;

use tracing::debug;

use aperture_types::{BindTarget, PermissionHandle, TargetId};

use crate::error::{BindingError, Result};
use crate::store::{BindingEntry, BindingStore};

// ============================================================================
// Bind
// ============================================================================

/// An open bind transaction; completed by [`to`](Self::to).
///
/// Dropping the transaction without calling `to` leaves the store's
/// transaction guard set, so the next `bind`/`unbind` surfaces the
/// programming error instead of silently proceeding.
#[must_use = "bind() opens a transaction that must be completed with to()"]
pub struct BindTransaction<T: BindTarget + ?Sized> {
    store: BindingStore<T>,
    targets: Vec<Arc<T>>,
}

impl<T: BindTarget + ?Sized> BindTransaction<T> {
    pub(crate) fn new(store: BindingStore<T>, targets: Vec<Arc<T>>) -> Self {
        Self { store, targets }
    }

    /// Unions `permissions` into each target's set and closes the
    /// transaction.
    ///
    /// The returned [`Reverter`] captures exactly the pairs newly added by
    /// this call, so reverting subtracts only what this call contributed.
    ///
    /// # Errors
    ///
    /// [`BindingError::EmptyPermissions`] for an empty permission list; the
    /// transaction is closed and nothing is mutated.
    pub fn to(self, permissions: Vec<PermissionHandle>) -> Result<Reverter<T>> {
        if permissions.is_empty() {
            self.store.close_transaction();
            return Err(BindingError::EmptyPermissions);
        }

        let mut recorded: Vec<(TargetId, Vec<PermissionHandle>)> = Vec::new();
        for target in &self.targets {
            let id = target.target_id();
            let mut entry =
                self.store
                    .inner
                    .entries
                    .entry(id)
                    .or_insert_with(|| BindingEntry {
                        target: Arc::downgrade(target),
                        permissions: std::collections::HashSet::new(),
                    });
            let added: Vec<PermissionHandle> = permissions
                .iter()
                .filter(|permission| entry.permissions.insert((*permission).clone()))
                .cloned()
                .collect();
            if !added.is_empty() {
                recorded.push((id, added));
            }
        }

        debug!(
            kind = %self.store.kind(),
            targets = self.targets.len(),
            permissions = permissions.len(),
            "targets bound"
        );

        self.store.close_transaction();
        Ok(Reverter {
            store: self.store.clone(),
            recorded,
            spent: false,
        })
    }
}

// ============================================================================
// Unbind
// ============================================================================

/// An open unbind transaction; completed by [`from`](Self::from) or
/// [`from_all`](Self::from_all).
#[must_use = "unbind() opens a transaction that must be completed with from() or from_all()"]
pub struct UnbindTransaction<T: BindTarget + ?Sized> {
    store: BindingStore<T>,
    targets: Vec<Arc<T>>,
}

impl<T: BindTarget + ?Sized> UnbindTransaction<T> {
    pub(crate) fn new(store: BindingStore<T>, targets: Vec<Arc<T>>) -> Self {
        Self { store, targets }
    }

    /// Set-subtracts `permissions` from each target's set; a target with no
    /// binding is left untouched.
    ///
    /// # Errors
    ///
    /// [`BindingError::EmptyPermissions`] for an empty permission list.
    pub fn from(self, permissions: Vec<PermissionHandle>) -> Result<()> {
        if permissions.is_empty() {
            self.store.close_transaction();
            return Err(BindingError::EmptyPermissions);
        }

        for target in &self.targets {
            if let Some(mut entry) = self.store.inner.entries.get_mut(&target.target_id()) {
                for permission in &permissions {
                    entry.permissions.remove(permission);
                }
            }
        }

        debug!(
            kind = %self.store.kind(),
            targets = self.targets.len(),
            permissions = permissions.len(),
            "permissions unbound"
        );

        self.store.close_transaction();
        Ok(())
    }

    /// Removes each target's entry entirely and closes the transaction.
    ///
    /// Returns the ids whose entries were actually removed. A target left
    /// with no bound permissions is unrestricted; the component-kind caller
    /// resets visibility accordingly.
    pub fn from_all(self) -> Vec<TargetId> {
        let mut removed = Vec::new();
        for target in &self.targets {
            let id = target.target_id();
            if self.store.inner.entries.remove(&id).is_some() {
                removed.push(id);
            }
        }

        debug!(
            kind = %self.store.kind(),
            removed = removed.len(),
            "targets fully unbound"
        );

        self.store.close_transaction();
        removed
    }
}

// ============================================================================
// Reverter
// ============================================================================

/// Undo handle for one `bind(..).to(..)` call, usable exactly once.
pub struct Reverter<T: BindTarget + ?Sized> {
    store: BindingStore<T>,
    recorded: Vec<(TargetId, Vec<PermissionHandle>)>,
    spent: bool,
}

impl<T: BindTarget + ?Sized> Reverter<T> {
    /// Subtracts exactly the permissions the originating call added.
    ///
    /// # Errors
    ///
    /// [`BindingError::ReverterSpent`] on a second call.
    pub fn revert(&mut self) -> Result<()> {
        if self.spent {
            return Err(BindingError::ReverterSpent);
        }
        self.spent = true;

        for (id, permissions) in &self.recorded {
            if let Some(mut entry) = self.store.inner.entries.get_mut(id) {
                for permission in permissions {
                    entry.permissions.remove(permission);
                }
            }
        }

        debug!(
            kind = %self.store.kind(),
            targets = self.recorded.len(),
            "bind reverted"
        );

        Ok(())
    }

    /// Whether `revert` has been called.
    pub fn is_spent(&self) -> bool {
        self.spent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_types::{Permission, TargetKind};

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct RoleRequired(&'static str);

    impl Permission for RoleRequired {}

    struct Widget {
        id: TargetId,
    }

    impl BindTarget for Widget {
        fn target_id(&self) -> TargetId {
            self.id
        }
    }

    fn widget(id: u64) -> Arc<Widget> {
        Arc::new(Widget {
            id: TargetId::new(id),
        })
    }

    fn role(name: &'static str) -> PermissionHandle {
        PermissionHandle::new(RoleRequired(name))
    }

    #[test]
    fn test_reverter_restores_prior_set() {
        let store: BindingStore<Widget> = BindingStore::new(TargetKind::Component);
        let x = widget(1);

        store
            .bind(vec![Arc::clone(&x)])
            .unwrap()
            .to(vec![role("p1")])
            .unwrap();
        let mut reverter = store
            .bind(vec![Arc::clone(&x)])
            .unwrap()
            .to(vec![role("p2")])
            .unwrap();

        reverter.revert().unwrap();

        let bound = store.permissions_of(TargetId::new(1));
        assert_eq!(bound, vec![role("p1")]);
    }

    #[test]
    fn test_reverter_only_subtracts_what_it_added() {
        let store: BindingStore<Widget> = BindingStore::new(TargetKind::Component);
        let x = widget(1);

        store
            .bind(vec![Arc::clone(&x)])
            .unwrap()
            .to(vec![role("p1")])
            .unwrap();
        // p1 was already present; this call contributes only p2.
        let mut reverter = store
            .bind(vec![Arc::clone(&x)])
            .unwrap()
            .to(vec![role("p1"), role("p2")])
            .unwrap();

        reverter.revert().unwrap();

        let bound = store.permissions_of(TargetId::new(1));
        assert_eq!(bound, vec![role("p1")]);
    }

    #[test]
    fn test_reverter_single_use() {
        let store: BindingStore<Widget> = BindingStore::new(TargetKind::Component);
        let x = widget(1);

        let mut reverter = store
            .bind(vec![Arc::clone(&x)])
            .unwrap()
            .to(vec![role("p1")])
            .unwrap();

        assert!(reverter.revert().is_ok());
        assert!(reverter.is_spent());
        assert!(matches!(
            reverter.revert(),
            Err(BindingError::ReverterSpent)
        ));
    }

    #[test]
    fn test_empty_permissions_closes_transaction() {
        let store: BindingStore<Widget> = BindingStore::new(TargetKind::Component);
        let x = widget(1);

        assert!(matches!(
            store.bind(vec![Arc::clone(&x)]).unwrap().to(Vec::new()),
            Err(BindingError::EmptyPermissions)
        ));
        // The store stays usable: the rejected call closed the transaction.
        assert!(store.bind(vec![Arc::clone(&x)]).is_ok());
    }

    #[test]
    fn test_unbind_empty_permissions_rejected() {
        let store: BindingStore<Widget> = BindingStore::new(TargetKind::Component);
        let x = widget(1);

        assert!(matches!(
            store.unbind(vec![Arc::clone(&x)]).unwrap().from(Vec::new()),
            Err(BindingError::EmptyPermissions)
        ));
        assert!(store.bind(vec![x]).is_ok());
    }
}
