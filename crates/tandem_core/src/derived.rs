//! Derived projections of the engine inputs.

use crate::reconcile::SyncInputs;
use crate::resolver::Resolver;

/// Everything the engine exposes after one pass.
///
/// Every field is a pure function of the inputs and the resolved value and
/// is recomputed on every upstream change. `is_data_synced` is informational
/// and never gates side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncView<T> {
    /// The resolved value.
    pub value: Option<T>,
    /// `None` while the relevant sources have never emitted.
    pub is_loading: Option<bool>,
    /// Local and remote hold the same eligible row.
    pub is_data_synced: bool,
    /// A sync could run right now.
    pub can_sync_data: bool,
    /// The local row is eligible for synchronization.
    pub should_sync_data: bool,
}

impl<T> Default for SyncView<T> {
    fn default() -> Self {
        Self {
            value: None,
            is_loading: None,
            is_data_synced: false,
            can_sync_data: false,
            should_sync_data: false,
        }
    }
}

impl<T: PartialEq> SyncView<T> {
    /// Projects the inputs and the resolved value.
    pub fn project<R: Resolver<T> + ?Sized>(
        inputs: &SyncInputs<T>,
        value: Option<T>,
        resolver: &R,
    ) -> Self {
        let is_loading = Self::loading_of(inputs);
        let local_data = inputs.local.as_ref().and_then(|s| s.data.as_ref());
        let remote_data = inputs.remote.as_ref().and_then(|s| s.data.as_ref());
        let should_sync_data = resolver.should_sync_data(local_data);

        let settled = is_loading == Some(false);
        let is_data_synced = settled && local_data == remote_data && should_sync_data;
        let can_sync_data = inputs.sync_enabled && settled && local_data.is_some();

        Self {
            value,
            is_loading,
            is_data_synced,
            can_sync_data,
            should_sync_data,
        }
    }

    fn loading_of(inputs: &SyncInputs<T>) -> Option<bool> {
        if !inputs.sync_enabled {
            return inputs.local.as_ref().map(|s| s.is_loading);
        }
        match (&inputs.local, &inputs.remote) {
            (None, None) => None,
            (local, remote) => {
                let local_loading = local.as_ref().map_or(true, |s| s.is_loading);
                let remote_loading = remote.as_ref().map_or(true, |s| s.is_loading);
                Some(local_loading || remote_loading)
            }
        }
    }
}
