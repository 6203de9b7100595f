//! # aperture-binding: Target-to-permission binding store
//!
//! Maintains the many-to-many relation between bindable targets and
//! permission objects. Mutation goes through two-call fluent transactions:
//!
//! ```text
//! store.bind(targets)?.to(permissions)?      -> Reverter
//! store.unbind(targets)?.from(permissions)?
//! store.unbind(targets)?.from_all()
//! ```
//!
//! At most one transaction may be open per store at a time; opening a
//! second before the first is completed is a contract violation. Targets
//! are held weakly — a binding never keeps a UI element alive, and entries
//! whose target has been dropped are pruned rather than evaluated.
//!
//! Components and views use two separate store instances so that a
//! bookkeeping bug in one kind cannot corrupt the other.

pub mod error;
pub mod store;
pub mod transaction;

pub use error::{BindingError, Result};
pub use store::{BindingStore, BoundTarget};
pub use transaction::{BindTransaction, Reverter, UnbindTransaction};
