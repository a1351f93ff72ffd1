//! In-memory store adapters.
//!
//! Reference collaborators for tests, demos and ephemeral sessions. Rows are
//! keyed by owner; every accepted write is published to the owner's status
//! channel, which plays the role of a change notification.

use crate::error::{EngineError, EngineResult};
use crate::source::{LocalStore, RemoteStore, StatusReceiver};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tandem_core::{accepts_write, DataStatus, OwnerKey, SyncEntity};
use tokio::sync::watch;
use tracing::debug;

type Channels<T> = RwLock<HashMap<OwnerKey, watch::Sender<Option<DataStatus<T>>>>>;

/// Drops the channels of owners nobody observes any more.
fn prune_unobserved<T>(channels: &mut HashMap<OwnerKey, watch::Sender<T>>) {
    channels.retain(|_, tx| tx.receiver_count() > 0);
}

fn stale<T: SyncEntity>(stored: &T, incoming: &T) -> EngineError {
    EngineError::StaleWrite {
        owner: incoming.owner().to_string(),
        stored: stored.freshness().as_millis(),
        incoming: incoming.freshness().as_millis(),
    }
}

/// An in-memory local cache.
///
/// Loads instantly: subscribers see a settled status right away.
pub struct MemoryLocalStore<T> {
    rows: RwLock<HashMap<OwnerKey, T>>,
    channels: Channels<T>,
    upserts: AtomicU64,
    fail_writes: AtomicBool,
}

impl<T> MemoryLocalStore<T>
where
    T: SyncEntity + Clone + Send + Sync,
{
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            upserts: AtomicU64::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Stores a row without counting it as an upsert.
    pub fn seed(&self, value: T) {
        let owner = value.owner().clone();
        self.rows.write().insert(owner.clone(), value.clone());
        self.publish(&owner, DataStatus::present(value));
    }

    /// Returns the stored row of `owner`.
    pub fn row(&self, owner: &OwnerKey) -> Option<T> {
        self.rows.read().get(owner).cloned()
    }

    /// Number of accepted upserts.
    pub fn upsert_count(&self) -> u64 {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Makes subsequent upserts fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Re-emits the current row of `owner`, as a redundant disk notification would.
    pub fn renotify(&self, owner: &OwnerKey) {
        let row = self.row(owner);
        self.publish(owner, DataStatus::loaded(row));
    }

    /// Reports a refresh in flight for `owner`, keeping the stale row visible.
    pub fn begin_refresh(&self, owner: &OwnerKey) {
        let row = self.row(owner);
        self.publish(owner, DataStatus::new(row, true));
    }

    fn publish(&self, owner: &OwnerKey, status: DataStatus<T>) {
        if let Some(tx) = self.channels.read().get(owner) {
            tx.send_replace(Some(status));
        }
    }
}

impl<T> Default for MemoryLocalStore<T>
where
    T: SyncEntity + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LocalStore<T> for MemoryLocalStore<T>
where
    T: SyncEntity + Clone + Send + Sync,
{
    fn observe(&self, owner: &OwnerKey) -> StatusReceiver<T> {
        // The row is read under the channel lock so a concurrent upsert
        // either lands before the read or publishes to the new channel.
        let mut channels = self.channels.write();
        if let Some(tx) = channels.get(owner) {
            return tx.subscribe();
        }
        prune_unobserved(&mut *channels);
        let (tx, rx) = watch::channel(Some(DataStatus::loaded(self.row(owner))));
        channels.insert(owner.clone(), tx);
        rx
    }

    fn upsert(&self, value: T) -> EngineResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EngineError::WriteRejected("local store is read-only".into()));
        }

        let owner = value.owner().clone();
        {
            let mut rows = self.rows.write();
            if let Some(current) = rows.get(&owner) {
                if !accepts_write(Some(current), &value) {
                    return Err(stale(current, &value));
                }
            }
            rows.insert(owner.clone(), value.clone());
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        debug!(%owner, freshness = %value.freshness(), "local upsert");
        self.publish(&owner, DataStatus::present(value));
        Ok(())
    }
}

/// An in-memory remote store.
///
/// Subscriptions start loading. With auto-load (the default) the load
/// completes immediately; otherwise it completes on `complete_load`.
pub struct MemoryRemoteStore<T> {
    rows: RwLock<HashMap<OwnerKey, T>>,
    channels: Channels<T>,
    uploads: RwLock<Vec<T>>,
    connected: AtomicBool,
    auto_load: bool,
    reject_uploads: AtomicBool,
}

impl<T> MemoryRemoteStore<T>
where
    T: SyncEntity + Clone + Send + Sync,
{
    /// Creates an empty, connected store whose loads complete immediately.
    pub fn new() -> Self {
        Self::with_auto_load(true)
    }

    /// Creates a store whose loads stay pending until `complete_load`.
    pub fn manual() -> Self {
        Self::with_auto_load(false)
    }

    fn with_auto_load(auto_load: bool) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            uploads: RwLock::new(Vec::new()),
            connected: AtomicBool::new(true),
            auto_load,
            reject_uploads: AtomicBool::new(false),
        }
    }

    /// Stores a row as if another device had written it.
    ///
    /// Settled subscribers see it immediately; pending loads are left alone.
    pub fn seed(&self, value: T) {
        let owner = value.owner().clone();
        self.rows.write().insert(owner.clone(), value.clone());
        if let Some(tx) = self.channels.read().get(&owner) {
            tx.send_if_modified(|current| match current {
                Some(status) if status.is_settled() => {
                    *status = DataStatus::present(value);
                    true
                }
                _ => false,
            });
        }
    }

    /// Returns the stored row of `owner`.
    pub fn row(&self, owner: &OwnerKey) -> Option<T> {
        self.rows.read().get(owner).cloned()
    }

    /// Every accepted upload, in order.
    pub fn uploads(&self) -> Vec<T> {
        self.uploads.read().clone()
    }

    /// Number of accepted uploads.
    pub fn upload_count(&self) -> usize {
        self.uploads.read().len()
    }

    /// Makes subsequent uploads fail.
    pub fn set_reject_uploads(&self, reject: bool) {
        self.reject_uploads.store(reject, Ordering::SeqCst);
    }

    /// Returns true while the store is reachable.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Completes a pending load for `owner`.
    pub fn complete_load(&self, owner: &OwnerKey) {
        let status = self.settled_status(owner);
        if let Some(tx) = self.channels.read().get(owner) {
            tx.send_replace(Some(status));
        }
    }

    /// Drops the connection. Subscribers settle on "no data".
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        for tx in self.channels.read().values() {
            tx.send_replace(Some(DataStatus::absent()));
        }
    }

    /// Restores the connection and reloads every subscription.
    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        let owners: Vec<OwnerKey> = self.channels.read().keys().cloned().collect();
        for owner in owners {
            self.start_load(&owner);
        }
    }

    fn settled_status(&self, owner: &OwnerKey) -> DataStatus<T> {
        if self.is_connected() {
            DataStatus::loaded(self.row(owner))
        } else {
            DataStatus::absent()
        }
    }

    fn start_load(&self, owner: &OwnerKey) {
        if let Some(tx) = self.channels.read().get(owner) {
            tx.send_replace(Some(DataStatus::loading()));
        }
        if self.auto_load {
            self.complete_load(owner);
        }
    }
}

impl<T> Default for MemoryRemoteStore<T>
where
    T: SyncEntity + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RemoteStore<T> for MemoryRemoteStore<T>
where
    T: SyncEntity + Clone + Send + Sync,
{
    fn observe(&self, owner: &OwnerKey) -> StatusReceiver<T> {
        let rx = {
            let mut channels = self.channels.write();
            match channels.get(owner) {
                Some(tx) => tx.subscribe(),
                None => {
                    prune_unobserved(&mut *channels);
                    let (tx, rx) = watch::channel(None);
                    channels.insert(owner.clone(), tx);
                    rx
                }
            }
        };
        self.start_load(owner);
        rx
    }

    fn upload(&self, value: T) -> EngineResult<()> {
        if !self.is_connected() {
            return Err(EngineError::unavailable("remote store disconnected"));
        }
        if self.reject_uploads.load(Ordering::SeqCst) {
            return Err(EngineError::WriteRejected("remote store refused upload".into()));
        }
        if value.owner().is_anonymous() {
            return Err(EngineError::MissingOwner);
        }

        let owner = value.owner().clone();
        {
            let mut rows = self.rows.write();
            if let Some(current) = rows.get(&owner) {
                if !accepts_write(Some(current), &value) {
                    return Err(stale(current, &value));
                }
            }
            rows.insert(owner.clone(), value.clone());
        }
        self.uploads.write().push(value.clone());
        debug!(%owner, freshness = %value.freshness(), "remote upload");

        if let Some(tx) = self.channels.read().get(&owner) {
            tx.send_replace(Some(DataStatus::present(value)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use tandem_core::Freshness;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        owner: OwnerKey,
        at: Freshness,
    }

    impl SyncEntity for Row {
        fn owner(&self) -> &OwnerKey {
            &self.owner
        }

        fn freshness(&self) -> Freshness {
            self.at
        }
    }

    fn row(owner: &str, at: u64) -> Row {
        Row {
            owner: OwnerKey::new(owner),
            at: Freshness::new(at),
        }
    }

    #[test]
    fn local_observe_is_settled() {
        let store = MemoryLocalStore::new();
        let alice = OwnerKey::new("alice");

        let rx = store.observe(&alice);
        assert_eq!(*rx.borrow(), Some(DataStatus::absent()));

        store.upsert(row("alice", 3)).unwrap();
        assert_eq!(*rx.borrow(), Some(DataStatus::present(row("alice", 3))));
        assert_eq!(store.upsert_count(), 1);
    }

    #[test]
    fn observe_sees_a_concurrent_upsert() {
        let store = MemoryLocalStore::new();
        for i in 0..500 {
            let owner = format!("user-{i}");
            let key = OwnerKey::new(owner.as_str());
            let barrier = Barrier::new(2);

            let rx = thread::scope(|s| {
                s.spawn(|| {
                    barrier.wait();
                    store.upsert(row(&owner, 1)).unwrap();
                });
                barrier.wait();
                store.observe(&key)
            });
            assert_eq!(*rx.borrow(), Some(DataStatus::present(row(&owner, 1))));
        }
    }

    #[test]
    fn unobserved_channels_are_pruned() {
        let local = MemoryLocalStore::<Row>::new();
        drop(local.observe(&OwnerKey::new("alice")));
        let _bob = local.observe(&OwnerKey::new("bob"));
        assert_eq!(local.channels.read().len(), 1);

        let remote = MemoryRemoteStore::<Row>::new();
        drop(remote.observe(&OwnerKey::new("alice")));
        let _bob = remote.observe(&OwnerKey::new("bob"));
        assert_eq!(remote.channels.read().len(), 1);
    }

    #[test]
    fn local_upsert_is_ordered_by_freshness() {
        let store = MemoryLocalStore::new();
        store.upsert(row("alice", 10)).unwrap();
        store.upsert(row("alice", 10)).unwrap();

        let err = store.upsert(row("alice", 5)).unwrap_err();
        assert!(matches!(err, EngineError::StaleWrite { stored: 10, incoming: 5, .. }));
        assert_eq!(store.row(&OwnerKey::new("alice")), Some(row("alice", 10)));
    }

    #[test]
    fn local_failed_writes() {
        let store = MemoryLocalStore::<Row>::new();
        store.set_fail_writes(true);
        assert!(matches!(
            store.upsert(row("alice", 1)),
            Err(EngineError::WriteRejected(_))
        ));
        assert_eq!(store.upsert_count(), 0);
    }

    #[test]
    fn local_refresh_keeps_stale_row() {
        let store = MemoryLocalStore::new();
        let alice = OwnerKey::new("alice");
        store.seed(row("alice", 4));
        let rx = store.observe(&alice);

        store.begin_refresh(&alice);
        assert_eq!(*rx.borrow(), Some(DataStatus::refreshing(row("alice", 4))));
    }

    #[test]
    fn remote_manual_load() {
        let store = MemoryRemoteStore::manual();
        let alice = OwnerKey::new("alice");
        store.seed(row("alice", 7));

        let rx = store.observe(&alice);
        assert_eq!(*rx.borrow(), Some(DataStatus::loading()));

        store.complete_load(&alice);
        assert_eq!(*rx.borrow(), Some(DataStatus::present(row("alice", 7))));
    }

    #[test]
    fn remote_disconnect_settles_absent() {
        let store = MemoryRemoteStore::new();
        let alice = OwnerKey::new("alice");
        store.seed(row("alice", 7));
        let rx = store.observe(&alice);

        store.disconnect();
        assert_eq!(*rx.borrow(), Some(DataStatus::absent()));
        assert!(store.upload(row("alice", 8)).unwrap_err().is_transient());

        store.reconnect();
        assert_eq!(*rx.borrow(), Some(DataStatus::present(row("alice", 7))));
    }

    #[test]
    fn remote_upload_rules() {
        let store = MemoryRemoteStore::new();
        let rx = store.observe(&OwnerKey::new("alice"));

        assert!(matches!(
            store.upload(Row {
                owner: OwnerKey::anonymous(),
                at: Freshness::new(1),
            }),
            Err(EngineError::MissingOwner)
        ));

        store.upload(row("alice", 2)).unwrap();
        assert_eq!(*rx.borrow(), Some(DataStatus::present(row("alice", 2))));
        assert_eq!(store.uploads(), vec![row("alice", 2)]);

        store.set_reject_uploads(true);
        assert!(store.upload(row("alice", 3)).is_err());
        assert_eq!(store.upload_count(), 1);
    }
}
