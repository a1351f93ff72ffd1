//! Benchmark utilities.

#![warn(missing_docs)]

use std::sync::Arc;
use tandem_core::{DataStatus, Freshness, OwnerKey, SyncInputs};
use tandem_engine::{Dispatcher, LocalStore, MemoryLocalStore, MemoryRemoteStore, RemoteStore};
use tandem_prefs::{PreferencesResolver, UserPreferences};

/// Owner used by every benchmark row.
pub const OWNER: &str = "bench-user";

/// A preferences row with the given freshness.
pub fn row(at: u64) -> UserPreferences {
    UserPreferences::new(OwnerKey::new(OWNER)).at(Freshness::new(at))
}

/// A resolver over throwaway in-memory stores with inline writes.
pub fn resolver() -> PreferencesResolver {
    PreferencesResolver::new(
        Some(OwnerKey::new(OWNER)),
        Arc::new(MemoryLocalStore::new()) as Arc<dyn LocalStore<UserPreferences>>,
        Arc::new(MemoryRemoteStore::new()) as Arc<dyn RemoteStore<UserPreferences>>,
        Dispatcher::inline(),
    )
}

/// One input triple per branch of the decision table, with its name.
pub fn branch_inputs() -> Vec<(&'static str, SyncInputs<UserPreferences>)> {
    let settled = |local: Option<u64>, remote: Option<u64>| {
        SyncInputs::new(
            Some(DataStatus::loaded(local.map(row))),
            Some(DataStatus::loaded(remote.map(row))),
            true,
        )
    };

    vec![
        ("sync_disabled", SyncInputs::new(Some(DataStatus::present(row(1))), None, false)),
        ("both_loading", SyncInputs::unknown(true)),
        (
            "local_only",
            SyncInputs::new(
                Some(DataStatus::present(row(1))),
                Some(DataStatus::loading()),
                true,
            ),
        ),
        ("both_absent", settled(None, None)),
        ("remote_present", settled(None, Some(5))),
        ("local_present", settled(Some(5), None)),
        ("equal", settled(Some(5), Some(5))),
        ("local_newer", settled(Some(9), Some(5))),
        ("remote_newer", settled(Some(5), Some(9))),
    ]
}
