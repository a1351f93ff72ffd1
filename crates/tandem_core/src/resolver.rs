//! Conflict resolution and the per-entity resolver.

use crate::entity::SyncEntity;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Outcome of comparing a present local row with a present remote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolvedState {
    /// Both rows carry the same freshness. Nothing to do.
    Equal,
    /// The local row is fresher and must be uploaded.
    Local,
    /// The remote row is fresher and must be written locally.
    Remote,
}

impl ResolvedState {
    /// Maps the ordering of local against remote.
    #[must_use]
    pub const fn from_ordering(local_vs_remote: Ordering) -> Self {
        match local_vs_remote {
            Ordering::Equal => ResolvedState::Equal,
            Ordering::Greater => ResolvedState::Local,
            Ordering::Less => ResolvedState::Remote,
        }
    }

    /// The outcome seen from the other side.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            ResolvedState::Equal => ResolvedState::Equal,
            ResolvedState::Local => ResolvedState::Remote,
            ResolvedState::Remote => ResolvedState::Local,
        }
    }
}

/// Per-entity strategy supplying comparison and side-effect operations.
///
/// One resolver exists per synchronized entity and owner session. None of
/// the operations may block the calling thread: writes are handed to a
/// background context and their outcome is observed through the next status
/// emission of the corresponding store.
///
/// # Invariants
///
/// - `resolve` is a total order: `Equal` only for equal freshness, and
///   `resolve(a, b) == resolve(b, a).inverse()`
/// - `upload_to_remote` and `upsert_to_local` are idempotent
pub trait Resolver<T>: Send + Sync {
    /// Uploads a local row to the remote store.
    fn upload_to_remote(&self, value: T);

    /// Writes a row to the local store (insert or replace).
    fn upsert_to_local(&self, value: T);

    /// Builds the row used when neither store holds one.
    fn create_default_instance(&self) -> T;

    /// Compares a present local row with a present remote row.
    fn resolve(&self, local: &T, remote: &T) -> ResolvedState;

    /// Returns true if the local row is eligible for synchronization.
    fn should_sync_data(&self, data: Option<&T>) -> bool;
}

/// Last-writer-wins comparison by freshness marker.
pub fn resolve_by_freshness<T: SyncEntity>(local: &T, remote: &T) -> ResolvedState {
    ResolvedState::from_ordering(local.freshness().cmp(&remote.freshness()))
}

/// Returns true if a store should accept `incoming` over `existing`.
///
/// Stores order concurrent upserts for the same owner by the entity's own
/// freshness marker, not by the order the writes arrive in.
pub fn accepts_write<T: SyncEntity>(existing: Option<&T>, incoming: &T) -> bool {
    existing.map_or(true, |current| incoming.freshness() >= current.freshness())
}
