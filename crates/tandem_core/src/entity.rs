//! Entity contract: freshness marker and owner identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic freshness marker carried by every synchronized entity.
///
/// Freshness markers are milliseconds since the Unix epoch and provide the
/// total order used for last-writer-wins resolution. Higher markers indicate
/// later writes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Freshness(pub u64);

impl Freshness {
    /// The smallest marker. Older than every real write.
    pub const ZERO: Freshness = Freshness(0);

    /// Creates a freshness marker from raw milliseconds.
    #[must_use]
    pub const fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Reads the wall clock.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self(millis)
    }

    /// Returns a marker strictly later than `previous`.
    ///
    /// Uses the wall clock when it has moved past `previous`, otherwise
    /// `previous + 1`, so successive edits stay ordered even if the clock
    /// stalls or steps back.
    #[must_use]
    pub fn after(previous: Freshness) -> Self {
        Self::now().max(previous.next())
    }

    /// Returns the next marker.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the raw milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fresh:{}", self.0)
    }
}

/// Identity of the user or session a synchronized entity belongs to.
///
/// Selects which local and remote rows are compared. Changes on sign-in and
/// sign-out. The reserved anonymous key marks rows that belong to an
/// unauthenticated owner and are never uploaded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerKey(String);

impl OwnerKey {
    const ANONYMOUS: &'static str = "~anonymous";

    /// Creates an owner key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key used for rows of an unauthenticated owner.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    /// Returns true for the anonymous key.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// An entity that can be reconciled between a local and a remote store.
///
/// Two instances with equal freshness markers are treated as equal for
/// resolution purposes regardless of other field differences.
pub trait SyncEntity {
    /// The owner this row belongs to.
    fn owner(&self) -> &OwnerKey;

    /// The freshness marker of the last write to this row.
    fn freshness(&self) -> Freshness;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_ordering() {
        assert!(Freshness::new(1) < Freshness::new(2));
        assert_eq!(Freshness::new(7).next(), Freshness::new(8));
        assert_eq!(Freshness::new(u64::MAX).next(), Freshness::new(u64::MAX));
    }

    #[test]
    fn after_is_strictly_later() {
        let future = Freshness::new(u64::MAX - 10);
        assert_eq!(Freshness::after(future), Freshness::new(u64::MAX - 9));

        let past = Freshness::new(1);
        assert!(Freshness::after(past) > past);
    }

    #[test]
    fn freshness_display() {
        assert_eq!(Freshness::new(42).to_string(), "fresh:42");
    }

    #[test]
    fn anonymous_owner() {
        assert!(OwnerKey::anonymous().is_anonymous());
        assert!(!OwnerKey::new("alice").is_anonymous());
        assert_eq!(OwnerKey::from("bob").as_str(), "bob");
    }
}
