//! # Tandem Core
//!
//! Pure reconciliation core for Tandem.
//!
//! This crate provides:
//! - `DataStatus` for the `{data, is_loading}` pairs each source emits
//! - `Freshness` and `OwnerKey` for the entity contract (`SyncEntity`)
//! - The `Resolver` extension point and `ResolvedState`
//! - The decision table (`decide`, `reconcile`)
//! - Derived projections (`SyncView`)
//!
//! This is a pure crate with no I/O. Streams, tasks and stores live in
//! `tandem_engine` and `tandem_store`.
//!
//! ## Key Invariants
//!
//! - Sync disabled always yields the local value with no side effect
//! - Two loading sources always yield `None`
//! - At most one corrective action per pass
//! - Resolution is last-writer-wins by a single freshness marker

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod derived;
mod entity;
mod reconcile;
mod resolver;
mod status;

pub use derived::SyncView;
pub use entity::{Freshness, OwnerKey, SyncEntity};
pub use reconcile::{decide, reconcile, Reconciliation, SyncAction, SyncInputs};
pub use resolver::{accepts_write, resolve_by_freshness, ResolvedState, Resolver};
pub use status::DataStatus;
