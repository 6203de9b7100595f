//! # aperture-evaluator: Evaluator registry and permission resolution
//!
//! Maps permission types to pluggable evaluators and resolves the evaluator
//! responsible for a given permission value:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Permission value                            │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  EvaluatorRegistry                           │
//! │  ├─ Exact-type map (built once)              │
//! │  ├─ Generalization scan (BFS, tie-break)     │
//! │  └─ Derived-lookup memo (per exact type)     │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  granted: bool                               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Ambiguity handling is a deliberate policy choice ([`ResolutionPolicy`]):
//! the default rejects any configuration where more than one registered
//! evaluator is compatible with an unregistered permission type; the
//! nearest-match policy is an explicit opt-in that picks by generalization
//! distance.

pub mod error;
pub mod evaluator;
pub mod grant_cache;
pub mod registry;

pub use error::{EvaluatorError, Result};
pub use evaluator::{Evaluator, EvaluatorSet, PermissionEvaluator, evaluator_fn};
pub use grant_cache::GrantCache;
pub use registry::{EvaluatorRegistry, ResolutionPolicy, ResolvedEvaluator};
