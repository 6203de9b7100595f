//! # aperture-engine: Apply/reconciliation engine
//!
//! Owns the per-session [`AuthorizationContext`] and the algorithm that
//! turns bound permissions into committed visibility:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  apply(targets)                              │
//! │  1. collect distinct permissions             │
//! │  2. evaluate once each (grant cache)         │──  read phase
//! │  3. AND-fold per target                      │
//! │  4. external-mutation consistency check      │──┐
//! │  5. commit visibility + tracker              │  │ write phase
//! │  6. replay navigation                        │  │ side effects
//! │  7. refresh data providers                   │──┘
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Evaluation completes before any visibility is written, so one apply sees
//! a consistent snapshot of grants for every target in the batch. Commits
//! are immediate and non-transactional across targets; a failed apply is
//! converged by an idempotent re-apply.

pub mod context;
pub mod error;
pub mod navigation;
pub mod tracker;

pub use context::AuthorizationContext;
pub use error::{EngineError, Result};
pub use navigation::NavigationFacade;
pub use tracker::VisibilityTracker;
