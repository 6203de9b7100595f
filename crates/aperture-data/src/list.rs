//! In-memory item source with a persistent predicate filter.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use aperture_types::{DynHash, Permission, Refreshable};

use crate::error::Result;
use crate::provider::{DataProvider, ItemFilter, Query};

/// An in-memory item source.
///
/// Holds its items directly and supports a persistent filter predicate, so
/// the in-memory authorization path needs no wrapper: the evaluator is
/// installed as the filter and every fetch, size, and refresh call is
/// filtered by the source's own mechanism.
pub struct ListProvider<T> {
    items: RwLock<Vec<T>>,
    filter: RwLock<Option<ItemFilter<T>>>,
    refreshes: AtomicU64,
}

impl<T: Permission + Clone> ListProvider<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            filter: RwLock::new(None),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Installs the persistent filter predicate, replacing any previous
    /// one, and refreshes.
    pub fn install_filter(&self, filter: ItemFilter<T>) {
        *self.filter.write().expect("filter lock poisoned") = Some(filter);
        debug!("persistent filter installed");
        self.notify();
    }

    /// Removes the persistent filter.
    pub fn clear_filter(&self) {
        *self.filter.write().expect("filter lock poisoned") = None;
        self.notify();
    }

    /// Whether a persistent filter is currently installed.
    pub fn has_filter(&self) -> bool {
        self.filter.read().expect("filter lock poisoned").is_some()
    }

    /// Replaces the item list and refreshes.
    pub fn set_items(&self, items: Vec<T>) {
        *self.items.write().expect("items lock poisoned") = items;
        self.notify();
    }

    /// The number of refresh notifications issued so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn notify(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn filtered_items(&self) -> Vec<T> {
        let filter = self.filter.read().expect("filter lock poisoned");
        let items = self.items.read().expect("items lock poisoned");
        match filter.as_ref() {
            Some(filter) => items
                .iter()
                .filter(|item| filter.test(item))
                .cloned()
                .collect(),
            None => items.clone(),
        }
    }
}

impl<T: Permission + Clone> DataProvider<T> for ListProvider<T> {
    fn fetch(&self, query: &Query) -> Result<Vec<T>> {
        Ok(query.slice(self.filtered_items()))
    }

    fn size(&self, query: &Query) -> Result<usize> {
        let _ = query;
        Ok(self.filtered_items().len())
    }

    fn item_id(&self, item: &T) -> Result<u64> {
        // The item's own identity hash serves as its id.
        let mut hasher = DefaultHasher::new();
        item.dyn_hash(&mut hasher);
        Ok(hasher.finish())
    }

    fn refresh_item(&self, item: &T) -> Result<()> {
        let _ = item;
        self.notify();
        Ok(())
    }

    fn refresh(&self) {
        self.notify();
    }
}

impl<T: Permission + Clone> Refreshable for ListProvider<T> {
    fn refresh(&self) {
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Document(&'static str);

    impl Permission for Document {}

    fn provider() -> ListProvider<Document> {
        ListProvider::new(vec![
            Document("alpha"),
            Document("beta"),
            Document("gamma"),
        ])
    }

    #[test]
    fn test_unfiltered_fetch_and_size() {
        let provider = provider();
        let items = provider.fetch(&Query::all()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(provider.size(&Query::all()).unwrap(), 3);
    }

    #[test]
    fn test_persistent_filter_applies_everywhere() {
        let provider = provider();
        provider.install_filter(ItemFilter::new(|document: &Document| {
            document.0 != "beta"
        }));

        let items = provider.fetch(&Query::all()).unwrap();
        assert_eq!(items, vec![Document("alpha"), Document("gamma")]);
        assert_eq!(provider.size(&Query::all()).unwrap(), 2);
    }

    #[test]
    fn test_filter_preserves_order_and_paging() {
        let provider = provider();
        provider.install_filter(ItemFilter::new(|document: &Document| {
            document.0 != "alpha"
        }));

        let page = provider.fetch(&Query::page(1, 1)).unwrap();
        assert_eq!(page, vec![Document("gamma")]);
    }

    #[test]
    fn test_install_filter_refreshes() {
        let provider = provider();
        let before = provider.refresh_count();
        provider.install_filter(ItemFilter::new(|_: &Document| true));
        assert!(provider.refresh_count() > before);
    }

    #[test]
    fn test_item_id_is_stable() {
        let provider = provider();
        let a = provider.item_id(&Document("alpha")).unwrap();
        let b = provider.item_id(&Document("alpha")).unwrap();
        let c = provider.item_id(&Document("beta")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
