//! Item-source traits and the paged query.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Query
// ============================================================================

/// A paged item request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Items to skip.
    pub offset: usize,
    /// Maximum items to return; `None` means unbounded.
    pub limit: Option<usize>,
}

impl Query {
    /// Everything, unpaged.
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: None,
        }
    }

    /// One page.
    pub fn page(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    /// The same request without paging, for counting.
    pub fn unpaged(&self) -> Self {
        Self::all()
    }

    /// Applies this query's paging to a full item list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::all()
    }
}

// ============================================================================
// Filters
// ============================================================================

/// A predicate filter in the form an item source natively understands.
///
/// Derived from an evaluator for pass-down into sources that can filter on
/// their own; the post-fetch integrity check still governs.
pub struct ItemFilter<T> {
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> ItemFilter<T> {
    pub fn new(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Whether `item` passes the filter.
    pub fn test(&self, item: &T) -> bool {
        (self.predicate)(item)
    }
}

impl<T> Clone for ItemFilter<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> std::fmt::Debug for ItemFilter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ItemFilter")
    }
}

// ============================================================================
// Provider traits
// ============================================================================

/// A paged or streamed item source.
///
/// Remote and lazy sources surface their own failures through
/// [`ProviderError::Source`](crate::error::ProviderError::Source).
pub trait DataProvider<T>: Send + Sync {
    /// Fetches one page of items.
    fn fetch(&self, query: &Query) -> Result<Vec<T>>;

    /// The number of items matching `query`.
    fn size(&self, query: &Query) -> Result<usize>;

    /// A stable identifier for `item`.
    fn item_id(&self, item: &T) -> Result<u64>;

    /// Re-reads a single known item.
    fn refresh_item(&self, item: &T) -> Result<()>;

    /// Notifies the host that the visible item set changed.
    fn refresh(&self);
}

/// An item source that can apply a caller-supplied filter natively.
pub trait FilterableProvider<T>: DataProvider<T> {
    /// Fetches one page with `filter` applied by the source itself.
    fn fetch_filtered(&self, query: &Query, filter: &ItemFilter<T>) -> Result<Vec<T>>;

    /// Counts items matching `query` with `filter` applied natively.
    fn size_filtered(&self, query: &Query, filter: &ItemFilter<T>) -> Result<usize>;
}
