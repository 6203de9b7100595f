//! # aperture-data: Permission-filtering data providers
//!
//! Row-level enforcement for item sources:
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Original fetch                      │
//! │  [i1, i2, i3]                        │
//! └───────────────┬─────────────────────┘
//!                 │
//!                 ▼
//! ┌─────────────────────────────────────┐
//! │  AuthorizedProvider                  │
//! │  - evaluate each item                │
//! │  - pass native filter down if the    │
//! │    source supports one               │
//! │  - assert native filter integrity    │
//! └───────────────┬─────────────────────┘
//!                 │
//!                 ▼
//! ┌─────────────────────────────────────┐
//! │  Filtered fetch                      │
//! │  [i1, i2]   (order preserved)        │
//! └─────────────────────────────────────┘
//! ```
//!
//! In-memory sources skip the wrapper entirely: the evaluator is installed
//! as the source's own persistent filter predicate.

pub mod authorized;
pub mod error;
pub mod list;
pub mod provider;

pub use authorized::{AuthorizedProvider, authorize_in_memory};
pub use error::{ProviderError, Result};
pub use list::ListProvider;
pub use provider::{DataProvider, FilterableProvider, ItemFilter, Query};
