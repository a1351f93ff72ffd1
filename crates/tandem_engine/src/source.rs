//! Store adapter abstraction.
//!
//! The engine consumes two collaborators per entity: a local cache and a
//! remote store. Both expose a continuously updated status stream keyed by
//! owner and one write operation. Streams are `tokio::sync::watch` channels:
//! the latest value wins and intermediate values may be coalesced.

use crate::error::EngineResult;
use tandem_core::{DataStatus, OwnerKey};
use tokio::sync::watch;

/// Status stream of one store for one owner.
///
/// `None` means the store has not emitted anything yet (unknown).
pub type StatusReceiver<T> = watch::Receiver<Option<DataStatus<T>>>;

/// A locally persisted cache.
///
/// This trait abstracts the persistence layer, allowing for different
/// implementations (file-backed, in-memory, platform databases).
pub trait LocalStore<T>: Send + Sync {
    /// Subscribes to the row of `owner`.
    fn observe(&self, owner: &OwnerKey) -> StatusReceiver<T>;

    /// Inserts or replaces the row keyed by the value's owner.
    ///
    /// Must be idempotent. May block on I/O: the engine always calls it from
    /// a background context.
    fn upsert(&self, value: T) -> EngineResult<()>;
}

/// The authoritative remote store.
pub trait RemoteStore<T>: Send + Sync {
    /// Subscribes to the row of `owner`.
    ///
    /// Must report `is_loading = true` on subscribe and again on every
    /// reconnect. A failed load settles as `DataStatus::absent()`.
    fn observe(&self, owner: &OwnerKey) -> StatusReceiver<T>;

    /// Uploads a row. Atomic per entity and idempotent.
    fn upload(&self, value: T) -> EngineResult<()>;
}

/// A status stream that never emits.
///
/// Used for the remote side of a session without an owner: sync is disabled
/// and the remote row is never consulted.
pub fn silent<T>() -> StatusReceiver<T> {
    let (_tx, rx) = watch::channel(None);
    rx
}
