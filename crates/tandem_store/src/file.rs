//! File-backed local cache.

use crate::config::FileStoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::layout::{self, LOCK_FILE, ROW_EXTENSION};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tandem_core::{accepts_write, DataStatus, OwnerKey, SyncEntity};
use tandem_engine::{EngineError, EngineResult, LocalStore, StatusReceiver};
use tokio::sync::watch;
use tracing::{debug, warn};

/// A `LocalStore` that keeps one CBOR file per owner.
///
/// # Durability
///
/// Each upsert writes the encoded row to a temporary file, syncs it, renames
/// it over the row file and syncs the directory (when `sync_on_write` is set).
///
/// # Thread Safety
///
/// The store holds an exclusive lock on its directory for its lifetime.
/// Writes within the process are serialized; subscribers are notified after
/// the rename.
///
/// # Example
///
/// ```rust,ignore
/// use tandem_store::{FileLocalStore, FileStoreConfig};
///
/// let store = FileLocalStore::<UserPreferences>::open(FileStoreConfig::new("cache"))?;
/// let rows = store.observe(&owner);
/// ```
#[derive(Debug)]
pub struct FileLocalStore<T> {
    config: FileStoreConfig,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
    channels: RwLock<HashMap<OwnerKey, watch::Sender<Option<DataStatus<T>>>>>,
    write_lock: Mutex<()>,
}

impl<T> FileLocalStore<T>
where
    T: Serialize + DeserializeOwned + SyncEntity + Clone + Send + Sync,
{
    /// Opens or creates a store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path is not a directory
    /// - Another process holds the lock (returns `Locked`)
    /// - I/O errors occur
    pub fn open(config: FileStoreConfig) -> StoreResult<Self> {
        let root = &config.root;
        if !root.exists() {
            if config.create_if_missing {
                fs::create_dir_all(root)?;
            } else {
                return Err(StoreError::invalid_layout(format!(
                    "store directory does not exist: {}",
                    root.display()
                )));
            }
        }

        if !root.is_dir() {
            return Err(StoreError::invalid_layout(format!(
                "path is not a directory: {}",
                root.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(root.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        debug!(root = %root.display(), "opened file store");
        Ok(Self {
            config,
            _lock_file: lock_file,
            channels: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Reads the row of `owner` from disk.
    ///
    /// Returns `None` if no row has been written.
    pub fn load(&self, owner: &OwnerKey) -> StoreResult<Option<T>> {
        let path = layout::row_path(self.root(), owner);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if data.is_empty() {
            return Ok(None);
        }

        let file = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let row: T = ciborium::from_reader(data.as_slice()).map_err(|e| StoreError::Decode {
            file: file.clone(),
            message: e.to_string(),
        })?;

        if row.owner() != owner {
            return Err(StoreError::Decode {
                file,
                message: format!("row belongs to {}", row.owner()),
            });
        }
        Ok(Some(row))
    }

    /// Lists the owners that have a row on disk, sorted.
    pub fn owners(&self) -> StoreResult<Vec<OwnerKey>> {
        let mut owners = Vec::new();
        for entry in fs::read_dir(self.root())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ROW_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match layout::owner_from_stem(stem) {
                Some(owner) => owners.push(owner),
                None => debug!(file = %path.display(), "skipping unrecognized file"),
            }
        }
        owners.sort();
        Ok(owners)
    }

    /// Encodes and atomically replaces the row file of the value's owner.
    fn write_row(&self, value: &T) -> StoreResult<()> {
        let mut data = Vec::new();
        ciborium::into_writer(value, &mut data).map_err(|e| StoreError::Encode(e.to_string()))?;

        let owner = value.owner();
        let row_path = layout::row_path(self.root(), owner);
        let temp_path = layout::temp_path(self.root(), owner);

        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        if self.config.sync_on_write {
            file.sync_all()?;
        }
        drop(file);

        fs::rename(&temp_path, &row_path)?;

        if self.config.sync_on_write {
            self.sync_directory()?;
        }
        Ok(())
    }

    /// Syncs the store directory so that a rename is durable.
    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        File::open(self.root())?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        Ok(())
    }

    fn status_of(&self, owner: &OwnerKey) -> DataStatus<T> {
        match self.load(owner) {
            Ok(row) => DataStatus::loaded(row),
            Err(error) => {
                warn!(%owner, %error, "unreadable cached row; treating as absent");
                DataStatus::absent()
            }
        }
    }

    fn publish(&self, owner: &OwnerKey, status: DataStatus<T>) {
        if let Some(tx) = self.channels.read().get(owner) {
            tx.send_replace(Some(status));
        }
    }
}

impl<T> LocalStore<T> for FileLocalStore<T>
where
    T: Serialize + DeserializeOwned + SyncEntity + Clone + Send + Sync,
{
    fn observe(&self, owner: &OwnerKey) -> StatusReceiver<T> {
        // Hold the channel lock across the disk read: an upsert that renames
        // after the read publishes only once the channel exists.
        let mut channels = self.channels.write();
        if let Some(tx) = channels.get(owner) {
            return tx.subscribe();
        }
        channels.retain(|_, tx| tx.receiver_count() > 0);
        let (tx, rx) = watch::channel(Some(self.status_of(owner)));
        channels.insert(owner.clone(), tx);
        rx
    }

    fn upsert(&self, value: T) -> EngineResult<()> {
        let _guard = self.write_lock.lock();
        let owner = value.owner().clone();

        let stored = match self.load(&owner) {
            Ok(stored) => stored,
            Err(StoreError::Decode { file, message }) => {
                warn!(%owner, %file, %message, "replacing unreadable cached row");
                None
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(stored) = &stored {
            if !accepts_write(Some(stored), &value) {
                return Err(EngineError::StaleWrite {
                    owner: owner.to_string(),
                    stored: stored.freshness().as_millis(),
                    incoming: value.freshness().as_millis(),
                });
            }
        }

        self.write_row(&value)?;
        debug!(%owner, freshness = %value.freshness(), "cached row written");
        self.publish(&owner, DataStatus::present(value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use tandem_testkit::Doc;
    use tempfile::tempdir;

    fn open(root: &Path) -> FileLocalStore<Doc> {
        FileLocalStore::open(FileStoreConfig::new(root)).unwrap()
    }

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("cache");

        let _store = open(&root);
        assert!(root.is_dir());
        assert!(root.join(LOCK_FILE).exists());
    }

    #[test]
    fn open_without_create_fails() {
        let temp = tempdir().unwrap();
        let config =
            FileStoreConfig::new(temp.path().join("missing")).with_create_if_missing(false);
        assert!(matches!(
            FileLocalStore::<Doc>::open(config),
            Err(StoreError::InvalidLayout(_))
        ));
    }

    #[test]
    fn second_open_is_locked() {
        let temp = tempdir().unwrap();
        let _store = open(temp.path());
        assert!(matches!(
            FileLocalStore::<Doc>::open(FileStoreConfig::new(temp.path())),
            Err(StoreError::Locked)
        ));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let temp = tempdir().unwrap();
        drop(open(temp.path()));
        let _store = open(temp.path());
    }

    #[test]
    fn rows_survive_reopen() {
        let temp = tempdir().unwrap();
        let alice = OwnerKey::new("alice");
        {
            let store = open(temp.path());
            store.upsert(Doc::new("alice", 4, "saved")).unwrap();
        }

        let store = open(temp.path());
        assert_eq!(store.load(&alice).unwrap(), Some(Doc::new("alice", 4, "saved")));
        assert!(!layout::temp_path(temp.path(), &alice).exists());
    }

    #[test]
    fn observe_reports_disk_state() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());
        let alice = OwnerKey::new("alice");

        let rx = store.observe(&alice);
        assert_eq!(*rx.borrow(), Some(DataStatus::absent()));

        store.upsert(Doc::new("alice", 1, "a")).unwrap();
        assert_eq!(*rx.borrow(), Some(DataStatus::present(Doc::new("alice", 1, "a"))));
    }

    #[test]
    fn observe_sees_a_concurrent_upsert() {
        let temp = tempdir().unwrap();
        let config = FileStoreConfig::new(temp.path()).with_sync_on_write(false);
        let store = FileLocalStore::open(config).unwrap();

        for i in 0..200 {
            let owner = format!("user-{i}");
            let key = OwnerKey::new(owner.as_str());
            let barrier = Barrier::new(2);

            let rx = thread::scope(|s| {
                s.spawn(|| {
                    barrier.wait();
                    store.upsert(Doc::new(&owner, 1, "x")).unwrap();
                });
                barrier.wait();
                store.observe(&key)
            });
            assert_eq!(*rx.borrow(), Some(DataStatus::present(Doc::new(&owner, 1, "x"))));
        }
    }

    #[test]
    fn unobserved_channels_are_pruned() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());

        drop(store.observe(&OwnerKey::new("alice")));
        let _bob = store.observe(&OwnerKey::new("bob"));
        assert_eq!(store.channels.read().len(), 1);
    }

    #[test]
    fn stale_writes_are_rejected() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());
        store.upsert(Doc::new("alice", 9, "new")).unwrap();

        let err = store.upsert(Doc::new("alice", 2, "old")).unwrap_err();
        assert!(matches!(err, EngineError::StaleWrite { stored: 9, incoming: 2, .. }));

        // same freshness is an idempotent rewrite
        store.upsert(Doc::new("alice", 9, "new")).unwrap();
        assert_eq!(store.load(&OwnerKey::new("alice")).unwrap(), Some(Doc::new("alice", 9, "new")));
    }

    #[test]
    fn owners_lists_rows() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());
        store.upsert(Doc::new("bob", 1, "")).unwrap();
        store.upsert(Doc::new("alice", 1, "")).unwrap();
        store.upsert(Doc::anonymous(1, "")).unwrap();
        fs::write(temp.path().join("notes.txt"), b"ignored").unwrap();

        let owners = store.owners().unwrap();
        assert_eq!(owners.len(), 3);
        assert!(owners.contains(&OwnerKey::anonymous()));
        assert!(owners.contains(&OwnerKey::new("alice")));
        assert!(owners.contains(&OwnerKey::new("bob")));
    }

    #[test]
    fn corrupt_row_is_absent_and_replaceable() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());
        let alice = OwnerKey::new("alice");
        fs::write(layout::row_path(temp.path(), &alice), b"\xff\xff not cbor").unwrap();

        assert!(matches!(store.load(&alice), Err(StoreError::Decode { .. })));
        let rx = store.observe(&alice);
        assert_eq!(*rx.borrow(), Some(DataStatus::absent()));

        store.upsert(Doc::new("alice", 1, "fresh")).unwrap();
        assert_eq!(store.load(&alice).unwrap(), Some(Doc::new("alice", 1, "fresh")));
    }

    #[test]
    fn misfiled_row_is_rejected() {
        let temp = tempdir().unwrap();
        let store = open(temp.path());
        store.upsert(Doc::new("bob", 1, "")).unwrap();
        fs::rename(
            layout::row_path(temp.path(), &OwnerKey::new("bob")),
            layout::row_path(temp.path(), &OwnerKey::new("alice")),
        )
        .unwrap();

        assert!(matches!(
            store.load(&OwnerKey::new("alice")),
            Err(StoreError::Decode { .. })
        ));
    }
}
