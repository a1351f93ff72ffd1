//! Property-based test generators using proptest.
//!
//! Freshness markers are drawn from a small range so that equal markers and
//! near collisions show up often.

use crate::fixtures::Doc;
use proptest::prelude::*;
use tandem_core::{DataStatus, Freshness, OwnerKey, SyncInputs};

/// Strategy for freshness markers.
pub fn freshness_strategy() -> impl Strategy<Value = Freshness> {
    (0u64..64).prop_map(Freshness::new)
}

/// Strategy for owner keys, including the anonymous key.
pub fn owner_strategy() -> impl Strategy<Value = OwnerKey> {
    prop_oneof![
        3 => prop::sample::select(vec!["alice", "bob"]).prop_map(OwnerKey::new),
        1 => Just(OwnerKey::anonymous()),
    ]
}

/// Strategy for documents of any owner.
pub fn doc_strategy() -> impl Strategy<Value = Doc> {
    (owner_strategy(), freshness_strategy(), "[a-z]{0,8}").prop_map(
        |(owner, updated_at, body)| Doc {
            owner,
            updated_at,
            body,
        },
    )
}

/// Strategy for documents of one owner.
pub fn owned_doc_strategy(owner: &'static str) -> impl Strategy<Value = Doc> {
    (freshness_strategy(), "[a-z]{0,8}")
        .prop_map(move |(at, body)| Doc::new(owner, at.as_millis(), body))
}

/// Strategy for a source status carrying documents from `docs`.
pub fn status_strategy<S>(docs: S) -> impl Strategy<Value = DataStatus<Doc>>
where
    S: Strategy<Value = Doc>,
{
    (prop::option::of(docs), any::<bool>())
        .prop_map(|(data, is_loading)| DataStatus::new(data, is_loading))
}

/// Strategy for engine inputs, unknown sources included.
pub fn inputs_strategy() -> impl Strategy<Value = SyncInputs<Doc>> {
    (
        prop::option::of(status_strategy(doc_strategy())),
        prop::option::of(status_strategy(doc_strategy())),
        any::<bool>(),
    )
        .prop_map(|(local, remote, sync_enabled)| SyncInputs::new(local, remote, sync_enabled))
}

/// Strategy for settled inputs of a single owner with sync enabled.
pub fn settled_inputs_strategy() -> impl Strategy<Value = SyncInputs<Doc>> {
    (
        prop::option::of(owned_doc_strategy("alice")),
        prop::option::of(owned_doc_strategy("alice")),
    )
        .prop_map(|(local, remote)| {
            SyncInputs::new(
                Some(DataStatus::loaded(local)),
                Some(DataStatus::loaded(remote)),
                true,
            )
        })
}
