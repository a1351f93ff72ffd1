//! Test fixtures: a sample entity and a recording resolver.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tandem_core::{resolve_by_freshness, Freshness, OwnerKey, ResolvedState, Resolver, SyncEntity};

/// A minimal synchronized document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Doc {
    /// Owner of the row.
    pub owner: OwnerKey,
    /// Freshness marker.
    pub updated_at: Freshness,
    /// Payload.
    pub body: String,
}

impl Doc {
    /// Creates a document with an explicit freshness marker.
    pub fn new(owner: &str, at: u64, body: impl Into<String>) -> Self {
        Self {
            owner: OwnerKey::new(owner),
            updated_at: Freshness::new(at),
            body: body.into(),
        }
    }

    /// Creates a document owned by the anonymous key.
    pub fn anonymous(at: u64, body: impl Into<String>) -> Self {
        Self {
            owner: OwnerKey::anonymous(),
            updated_at: Freshness::new(at),
            body: body.into(),
        }
    }

    /// Returns an edited copy with a strictly later freshness marker.
    #[must_use]
    pub fn edited(&self, body: impl Into<String>) -> Self {
        Self {
            owner: self.owner.clone(),
            updated_at: Freshness::after(self.updated_at),
            body: body.into(),
        }
    }

    /// Returns a copy with the given freshness marker.
    #[must_use]
    pub fn at(&self, at: u64) -> Self {
        Self {
            updated_at: Freshness::new(at),
            ..self.clone()
        }
    }
}

impl SyncEntity for Doc {
    fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    fn freshness(&self) -> Freshness {
        self.updated_at
    }
}

/// Default eligibility rule: a row is synced when present and not anonymous.
pub fn owned_rows<T: SyncEntity>(data: Option<&T>) -> bool {
    data.is_some_and(|row| !row.owner().is_anonymous())
}

/// A resolver that records writes instead of performing them.
///
/// Resolution is by freshness. Eligibility defaults to `owned_rows`.
pub struct RecordingResolver<T> {
    default: T,
    eligible: fn(Option<&T>) -> bool,
    uploads: RwLock<Vec<T>>,
    upserts: RwLock<Vec<T>>,
    defaults_created: AtomicUsize,
}

impl<T> RecordingResolver<T>
where
    T: SyncEntity + Clone + Send + Sync,
{
    /// Creates a resolver whose default instance is `default`.
    pub fn new(default: T) -> Self {
        Self {
            default,
            eligible: owned_rows::<T>,
            uploads: RwLock::new(Vec::new()),
            upserts: RwLock::new(Vec::new()),
            defaults_created: AtomicUsize::new(0),
        }
    }

    /// Replaces the eligibility rule.
    #[must_use]
    pub fn with_eligibility(mut self, eligible: fn(Option<&T>) -> bool) -> Self {
        self.eligible = eligible;
        self
    }

    /// Every value passed to `upload_to_remote`, in order.
    pub fn uploads(&self) -> Vec<T> {
        self.uploads.read().clone()
    }

    /// Every value passed to `upsert_to_local`, in order.
    pub fn upserts(&self) -> Vec<T> {
        self.upserts.read().clone()
    }

    /// Number of default instances created.
    pub fn defaults_created(&self) -> usize {
        self.defaults_created.load(Ordering::SeqCst)
    }

    /// Total number of recorded writes.
    pub fn write_count(&self) -> usize {
        self.uploads.read().len() + self.upserts.read().len()
    }
}

impl<T> Resolver<T> for RecordingResolver<T>
where
    T: SyncEntity + Clone + Send + Sync,
{
    fn upload_to_remote(&self, value: T) {
        self.uploads.write().push(value);
    }

    fn upsert_to_local(&self, value: T) {
        self.upserts.write().push(value);
    }

    fn create_default_instance(&self) -> T {
        self.defaults_created.fetch_add(1, Ordering::SeqCst);
        self.default.clone()
    }

    fn resolve(&self, local: &T, remote: &T) -> ResolvedState {
        resolve_by_freshness(local, remote)
    }

    fn should_sync_data(&self, data: Option<&T>) -> bool {
        (self.eligible)(data)
    }
}
