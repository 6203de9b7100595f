//! The authorization wrapper for paged/lazy/remote item sources, and the
//! filter-install path for in-memory sources.

use std::sync::Arc;

use tracing::{debug, warn};

use aperture_evaluator::{Evaluator, EvaluatorRegistry};
use aperture_types::{Permission, Refreshable};

use crate::error::{ProviderError, Result};
use crate::list::ListProvider;
use crate::provider::{DataProvider, FilterableProvider, ItemFilter, Query};

// ============================================================================
// In-memory path
// ============================================================================

/// Authorizes an in-memory source by installing the evaluator as its
/// persistent filter predicate. No wrapper object is involved; every
/// fetch, size, and refresh call is filtered by the source itself.
///
/// # Errors
///
/// [`EvaluatorError::NoEvaluatorFound`](aperture_evaluator::EvaluatorError::NoEvaluatorFound)
/// if no evaluator is registered for exactly the item type.
pub fn authorize_in_memory<T: Permission + Clone>(
    provider: &ListProvider<T>,
    registry: &EvaluatorRegistry,
) -> Result<()> {
    let evaluator = registry.resolve_exact::<T>()?;
    provider.install_filter(derive_filter(evaluator));
    Ok(())
}

/// Derives the source-native predicate from an exact-type evaluator.
///
/// The evaluator is exact for `T`, so a type mismatch cannot occur; should
/// one ever surface it is treated as a denial, never a grant.
fn derive_filter<T: Permission>(evaluator: Arc<dyn Evaluator>) -> ItemFilter<T> {
    ItemFilter::new(move |item: &T| evaluator.grants(item).unwrap_or(false))
}

// ============================================================================
// Wrapped path
// ============================================================================

enum Inner<T> {
    Plain(Arc<dyn DataProvider<T>>),
    Filterable(Arc<dyn FilterableProvider<T>>),
}

/// Wraps a paged/lazy/remote item source so every fetched item is checked
/// against the item type's evaluator.
///
/// If the inner source can apply a native filter, the evaluator-derived
/// predicate is passed down *and* the post-fetch check still runs as an
/// integrity assertion: an item surviving the native filter but failing
/// the evaluator is a fatal inconsistency.
pub struct AuthorizedProvider<T> {
    inner: Inner<T>,
    evaluator: Arc<dyn Evaluator>,
}

impl<T: Permission + Clone> AuthorizedProvider<T> {
    /// Wraps a source with no native filter support.
    ///
    /// # Errors
    ///
    /// [`EvaluatorError::NoEvaluatorFound`](aperture_evaluator::EvaluatorError::NoEvaluatorFound)
    /// if no evaluator is registered for exactly the item type.
    pub fn wrap(
        inner: Arc<dyn DataProvider<T>>,
        registry: &EvaluatorRegistry,
    ) -> Result<Arc<Self>> {
        let evaluator = registry.resolve_exact::<T>()?;
        Ok(Arc::new(Self {
            inner: Inner::Plain(inner),
            evaluator,
        }))
    }

    /// Wraps a source that applies filters natively.
    pub fn wrap_filterable(
        inner: Arc<dyn FilterableProvider<T>>,
        registry: &EvaluatorRegistry,
    ) -> Result<Arc<Self>> {
        let evaluator = registry.resolve_exact::<T>()?;
        Ok(Arc::new(Self {
            inner: Inner::Filterable(inner),
            evaluator,
        }))
    }

    /// The evaluator-derived filter in the inner source's native form.
    pub fn as_filter(&self) -> ItemFilter<T> {
        derive_filter(Arc::clone(&self.evaluator))
    }

    fn granted(&self, item: &T) -> Result<bool> {
        Ok(self.evaluator.grants(item)?)
    }

    /// Re-asserts the evaluator's decision for an item that a caller
    /// expects to exist.
    fn assert_granted(&self, item: &T) -> Result<()> {
        if self.granted(item)? {
            Ok(())
        } else {
            Err(ProviderError::ItemNotGranted {
                type_name: std::any::type_name::<T>(),
            })
        }
    }
}

impl<T: Permission + Clone> DataProvider<T> for AuthorizedProvider<T> {
    fn fetch(&self, query: &Query) -> Result<Vec<T>> {
        match &self.inner {
            Inner::Plain(inner) => {
                let fetched = inner.fetch(query)?;
                let total = fetched.len();
                let mut granted = Vec::with_capacity(total);
                for item in fetched {
                    if self.granted(&item)? {
                        granted.push(item);
                    }
                }
                if granted.len() < total {
                    debug!(
                        filtered = total - granted.len(),
                        "items removed by evaluator"
                    );
                }
                Ok(granted)
            }
            Inner::Filterable(inner) => {
                let filter = self.as_filter();
                let fetched = inner.fetch_filtered(query, &filter)?;
                // The native filter was derived from the evaluator; a
                // surviving denied item means the derivation disagrees
                // with the evaluator itself.
                for item in &fetched {
                    if !self.granted(item)? {
                        warn!("native filter passed an item its evaluator denies");
                        return Err(ProviderError::FilterIntegrity {
                            type_name: std::any::type_name::<T>(),
                        });
                    }
                }
                Ok(fetched)
            }
        }
    }

    fn size(&self, query: &Query) -> Result<usize> {
        match &self.inner {
            // The inner source's reported size does not reflect permission
            // filtering; count by fetching.
            Inner::Plain(_) => Ok(self.fetch(&query.unpaged())?.len()),
            Inner::Filterable(inner) => {
                inner.size_filtered(&query.unpaged(), &self.as_filter())
            }
        }
    }

    fn item_id(&self, item: &T) -> Result<u64> {
        self.assert_granted(item)?;
        match &self.inner {
            Inner::Plain(inner) => inner.item_id(item),
            Inner::Filterable(inner) => inner.item_id(item),
        }
    }

    fn refresh_item(&self, item: &T) -> Result<()> {
        self.assert_granted(item)?;
        match &self.inner {
            Inner::Plain(inner) => inner.refresh_item(item),
            Inner::Filterable(inner) => inner.refresh_item(item),
        }
    }

    fn refresh(&self) {
        match &self.inner {
            Inner::Plain(inner) => inner.refresh(),
            Inner::Filterable(inner) => inner.refresh(),
        }
    }
}

impl<T: Permission + Clone> Refreshable for AuthorizedProvider<T> {
    fn refresh(&self) {
        DataProvider::refresh(self);
    }
}
