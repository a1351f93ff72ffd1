//! The reconciliation decision table.
//!
//! Given the latest local status, remote status and sync flag, decide the
//! single externally visible value and at most one corrective action. The
//! decision is recomputed from scratch on every upstream change; no state is
//! carried between passes.
//!
//! Priority order:
//!
//! ```text
//! 1. sync disabled          -> local.data
//! 2. both loading           -> None
//! 3. only local finished    -> local.data
//! 4. only remote finished   -> remote.data
//! 5. both finished
//!    a. None / None         -> None,    create default locally
//!    b. None / Some(r)      -> r,       upsert r locally
//!    c. Some(l) / None      -> l,       upload l (if eligible)
//!    e. Some(l) / Some(r)   -> winner,  copy winner to the other side
//! ```

use crate::resolver::{ResolvedState, Resolver};
use crate::status::DataStatus;
use tracing::trace;

/// A corrective side effect decided by one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction<T> {
    /// Neither store holds a row: build a default and write it locally.
    CreateDefault,
    /// Write this row to the local store.
    UpsertLocal(T),
    /// Upload this row to the remote store.
    UploadRemote(T),
}

impl<T> SyncAction<T> {
    /// Short name used in logs and statistics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            SyncAction::CreateDefault => "create_default",
            SyncAction::UpsertLocal(_) => "upsert_local",
            SyncAction::UploadRemote(_) => "upload_remote",
        }
    }

    /// The row carried by the action, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&T> {
        match self {
            SyncAction::CreateDefault => None,
            SyncAction::UpsertLocal(value) | SyncAction::UploadRemote(value) => Some(value),
        }
    }

    /// Executes the action through the resolver.
    pub fn apply<R: Resolver<T> + ?Sized>(self, resolver: &R) {
        match self {
            SyncAction::CreateDefault => {
                let default = resolver.create_default_instance();
                resolver.upsert_to_local(default);
            }
            SyncAction::UpsertLocal(value) => resolver.upsert_to_local(value),
            SyncAction::UploadRemote(value) => resolver.upload_to_remote(value),
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<T> {
    /// The value exposed to consumers.
    pub value: Option<T>,
    /// The side effect to fire, if any.
    pub action: Option<SyncAction<T>>,
}

impl<T> Reconciliation<T> {
    fn settled(value: Option<T>) -> Self {
        Self {
            value,
            action: None,
        }
    }

    fn with_action(value: Option<T>, action: SyncAction<T>) -> Self {
        Self {
            value,
            action: Some(action),
        }
    }

    /// Returns true if no side effect is required.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.action.is_none()
    }
}

/// The latest combination of engine inputs.
///
/// A source that has not emitted yet is `None` (unknown). Unknown sources are
/// treated as loading by the decision table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncInputs<T> {
    /// Latest local status.
    pub local: Option<DataStatus<T>>,
    /// Latest remote status.
    pub remote: Option<DataStatus<T>>,
    /// Whether synchronization is enabled.
    pub sync_enabled: bool,
}

impl<T> SyncInputs<T> {
    /// Creates an input triple.
    #[must_use]
    pub const fn new(
        local: Option<DataStatus<T>>,
        remote: Option<DataStatus<T>>,
        sync_enabled: bool,
    ) -> Self {
        Self {
            local,
            remote,
            sync_enabled,
        }
    }

    /// Inputs before any source has emitted.
    #[must_use]
    pub const fn unknown(sync_enabled: bool) -> Self {
        Self::new(None, None, sync_enabled)
    }
}

impl<T: Clone> SyncInputs<T> {
    /// Runs the decision table on these inputs.
    pub fn decide<R: Resolver<T> + ?Sized>(&self, resolver: &R) -> Reconciliation<T> {
        let pending = DataStatus::loading();
        let local = self.local.as_ref().unwrap_or(&pending);
        let remote = self.remote.as_ref().unwrap_or(&pending);
        decide(local, remote, self.sync_enabled, resolver)
    }
}

/// Decides the visible value and the corrective action for one pass.
///
/// Pure: the resolver is only asked to compare and to judge eligibility,
/// never to write.
pub fn decide<T, R>(
    local: &DataStatus<T>,
    remote: &DataStatus<T>,
    sync_enabled: bool,
    resolver: &R,
) -> Reconciliation<T>
where
    T: Clone,
    R: Resolver<T> + ?Sized,
{
    let (branch, outcome) = decide_branch(local, remote, sync_enabled, resolver);
    trace!(
        branch,
        action = outcome.action.as_ref().map(SyncAction::name),
        has_value = outcome.value.is_some(),
        "reconciled"
    );
    outcome
}

fn decide_branch<T, R>(
    local: &DataStatus<T>,
    remote: &DataStatus<T>,
    sync_enabled: bool,
    resolver: &R,
) -> (&'static str, Reconciliation<T>)
where
    T: Clone,
    R: Resolver<T> + ?Sized,
{
    if !sync_enabled {
        return ("sync_disabled", Reconciliation::settled(local.data.clone()));
    }

    match (local.is_loading, remote.is_loading) {
        (true, true) => return ("both_loading", Reconciliation::settled(None)),
        (false, true) => return ("local_only", Reconciliation::settled(local.data.clone())),
        (true, false) => return ("remote_only", Reconciliation::settled(remote.data.clone())),
        (false, false) => {}
    }

    match (&local.data, &remote.data) {
        (None, None) => (
            "both_absent",
            Reconciliation::with_action(None, SyncAction::CreateDefault),
        ),
        (None, Some(r)) => (
            "remote_present",
            Reconciliation::with_action(Some(r.clone()), SyncAction::UpsertLocal(r.clone())),
        ),
        (Some(l), None) => {
            if resolver.should_sync_data(Some(l)) {
                let action = SyncAction::UploadRemote(l.clone());
                ("local_present", Reconciliation::with_action(Some(l.clone()), action))
            } else {
                ("local_unsyncable", Reconciliation::settled(Some(l.clone())))
            }
        }
        (Some(l), Some(r)) => {
            if !resolver.should_sync_data(Some(l)) {
                return ("local_unsyncable", Reconciliation::settled(Some(l.clone())));
            }
            match resolver.resolve(l, r) {
                ResolvedState::Equal => ("equal", Reconciliation::settled(Some(l.clone()))),
                ResolvedState::Local => {
                    let action = SyncAction::UploadRemote(l.clone());
                    ("local_newer", Reconciliation::with_action(Some(l.clone()), action))
                }
                ResolvedState::Remote => {
                    let action = SyncAction::UpsertLocal(r.clone());
                    ("remote_newer", Reconciliation::with_action(Some(r.clone()), action))
                }
            }
        }
    }
}

/// Decides and fires the corrective action, returning the visible value.
pub fn reconcile<T, R>(
    local: &DataStatus<T>,
    remote: &DataStatus<T>,
    sync_enabled: bool,
    resolver: &R,
) -> Option<T>
where
    T: Clone,
    R: Resolver<T> + ?Sized,
{
    let Reconciliation { value, action } = decide(local, remote, sync_enabled, resolver);
    if let Some(action) = action {
        action.apply(resolver);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Freshness, OwnerKey, SyncEntity};
    use crate::resolver::resolve_by_freshness;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Pref {
        owner: OwnerKey,
        at: Freshness,
    }

    impl SyncEntity for Pref {
        fn owner(&self) -> &OwnerKey {
            &self.owner
        }

        fn freshness(&self) -> Freshness {
            self.at
        }
    }

    fn p(at: u64) -> Pref {
        Pref {
            owner: OwnerKey::new("alice"),
            at: Freshness::new(at),
        }
    }

    #[derive(Default)]
    struct Recorder {
        syncable: bool,
        uploads: Mutex<Vec<Pref>>,
        upserts: Mutex<Vec<Pref>>,
    }

    impl Recorder {
        fn syncable() -> Self {
            Self {
                syncable: true,
                ..Self::default()
            }
        }
    }

    impl Resolver<Pref> for Recorder {
        fn upload_to_remote(&self, value: Pref) {
            self.uploads.lock().unwrap().push(value);
        }

        fn upsert_to_local(&self, value: Pref) {
            self.upserts.lock().unwrap().push(value);
        }

        fn create_default_instance(&self) -> Pref {
            p(0)
        }

        fn resolve(&self, local: &Pref, remote: &Pref) -> ResolvedState {
            resolve_by_freshness(local, remote)
        }

        fn should_sync_data(&self, data: Option<&Pref>) -> bool {
            self.syncable && data.is_some()
        }
    }

    #[test]
    fn remote_only_row_is_copied_locally() {
        let resolver = Recorder::syncable();
        let value = reconcile(
            &DataStatus::absent(),
            &DataStatus::present(p(10)),
            true,
            &resolver,
        );
        assert_eq!(value, Some(p(10)));
        assert_eq!(*resolver.upserts.lock().unwrap(), vec![p(10)]);
        assert!(resolver.uploads.lock().unwrap().is_empty());
    }

    #[test]
    fn newer_local_row_is_uploaded() {
        let resolver = Recorder::syncable();
        let value = reconcile(
            &DataStatus::present(p(20)),
            &DataStatus::present(p(10)),
            true,
            &resolver,
        );
        assert_eq!(value, Some(p(20)));
        assert_eq!(*resolver.uploads.lock().unwrap(), vec![p(20)]);
    }

    #[test]
    fn newer_remote_row_wins() {
        let resolver = Recorder::syncable();
        let value = reconcile(
            &DataStatus::present(p(5)),
            &DataStatus::present(p(9)),
            true,
            &resolver,
        );
        assert_eq!(value, Some(p(9)));
        assert_eq!(*resolver.upserts.lock().unwrap(), vec![p(9)]);
    }

    #[test]
    fn both_absent_creates_default_and_hides_it() {
        let resolver = Recorder::syncable();
        let value = reconcile(&DataStatus::absent(), &DataStatus::absent(), true, &resolver);
        assert_eq!(value, None);
        assert_eq!(*resolver.upserts.lock().unwrap(), vec![p(0)]);
    }

    #[test]
    fn sync_disabled_returns_local_without_effects() {
        let resolver = Recorder::syncable();
        let value = reconcile(
            &DataStatus::present(p(5)),
            &DataStatus::present(p(99)),
            false,
            &resolver,
        );
        assert_eq!(value, Some(p(5)));
        assert!(resolver.uploads.lock().unwrap().is_empty());
        assert!(resolver.upserts.lock().unwrap().is_empty());
    }

    #[test]
    fn loading_precedence() {
        let resolver = Recorder::syncable();
        let both = decide(
            &DataStatus::refreshing(p(1)),
            &DataStatus::refreshing(p(2)),
            true,
            &resolver,
        );
        assert_eq!(both, Reconciliation::settled(None));

        let remote_done = decide(
            &DataStatus::loading(),
            &DataStatus::present(p(1)),
            true,
            &resolver,
        );
        assert_eq!(remote_done.value, Some(p(1)));
        assert!(remote_done.is_converged());

        let local_done = decide(
            &DataStatus::present(p(3)),
            &DataStatus::loading(),
            true,
            &resolver,
        );
        assert_eq!(local_done.value, Some(p(3)));
        assert!(local_done.is_converged());
    }

    #[test]
    fn unsyncable_local_row_is_kept() {
        let resolver = Recorder::default();
        let alone = decide(&DataStatus::present(p(3)), &DataStatus::absent(), true, &resolver);
        assert_eq!(alone, Reconciliation::settled(Some(p(3))));

        let paired = decide(
            &DataStatus::present(p(3)),
            &DataStatus::present(p(8)),
            true,
            &resolver,
        );
        assert_eq!(paired, Reconciliation::settled(Some(p(3))));
    }

    #[test]
    fn equal_rows_converge() {
        let resolver = Recorder::syncable();
        let outcome = decide(
            &DataStatus::present(p(4)),
            &DataStatus::present(p(4)),
            true,
            &resolver,
        );
        assert_eq!(outcome, Reconciliation::settled(Some(p(4))));
    }

    #[test]
    fn unknown_inputs_count_as_loading() {
        let resolver = Recorder::syncable();
        let inputs = SyncInputs::<Pref>::unknown(true);
        assert_eq!(inputs.decide(&resolver), Reconciliation::settled(None));

        let inputs = SyncInputs::new(None, Some(DataStatus::present(p(2))), true);
        assert_eq!(inputs.decide(&resolver).value, Some(p(2)));
    }

    #[test]
    fn action_names_and_payloads() {
        assert_eq!(SyncAction::<Pref>::CreateDefault.name(), "create_default");
        assert_eq!(SyncAction::UpsertLocal(p(1)).payload(), Some(&p(1)));
        assert_eq!(SyncAction::UploadRemote(p(1)).name(), "upload_remote");
        assert_eq!(SyncAction::<Pref>::CreateDefault.payload(), None);
    }
}
