//! # aperture-types: Core types for Aperture
//!
//! This crate contains the shared types used across the Aperture engine:
//! - Permission values ([`Permission`], [`PermissionHandle`])
//! - Target identity ([`TargetId`], [`TargetKind`])
//! - Host-framework seams ([`Component`], [`View`], [`Refreshable`])
//!
//! Permissions are opaque application-defined values: the engine never
//! inspects them beyond their runtime type and their own equality. The host
//! framework's UI elements are consumed only through the narrow [`Component`]
//! and [`View`] traits; the engine holds them weakly and is never the sole
//! reason a target stays alive.

pub mod permission;
pub mod target;

pub use permission::{DynEq, DynHash, Permission, PermissionHandle};
pub use target::{BindTarget, Component, ComponentRef, Refreshable, TargetId, TargetKind, View, ViewRef};
