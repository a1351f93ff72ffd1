//! Source status values.

use serde::{Deserialize, Serialize};

/// The unit of information a source stream emits.
///
/// `is_loading == true` does not imply `data == None`: a stale value may be
/// shown while a refresh is in flight. There is no error variant. A source
/// that failed to load reports `DataStatus::absent()` once it has recovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataStatus<T> {
    /// Current belief of the source, if any.
    pub data: Option<T>,
    /// Whether the source is still loading.
    pub is_loading: bool,
}

impl<T> DataStatus<T> {
    /// Creates a status from its parts.
    #[must_use]
    pub const fn new(data: Option<T>, is_loading: bool) -> Self {
        Self { data, is_loading }
    }

    /// A source that is loading and has nothing to show yet.
    #[must_use]
    pub const fn loading() -> Self {
        Self::new(None, true)
    }

    /// A source that is refreshing while still holding a stale value.
    #[must_use]
    pub const fn refreshing(data: T) -> Self {
        Self::new(Some(data), true)
    }

    /// A source that has finished loading.
    #[must_use]
    pub const fn loaded(data: Option<T>) -> Self {
        Self::new(data, false)
    }

    /// A source that has finished loading and holds a value.
    #[must_use]
    pub const fn present(data: T) -> Self {
        Self::new(Some(data), false)
    }

    /// A source that has finished loading and holds nothing.
    #[must_use]
    pub const fn absent() -> Self {
        Self::new(None, false)
    }

    /// Returns true once the source has finished loading.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !self.is_loading
    }

    /// Borrows the data.
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Maps the carried value, keeping the loading flag.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> DataStatus<U> {
        DataStatus {
            data: self.data.map(f),
            is_loading: self.is_loading,
        }
    }
}

impl<T> Default for DataStatus<T> {
    fn default() -> Self {
        Self::loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(DataStatus::<u8>::loading(), DataStatus::new(None, true));
        assert_eq!(DataStatus::refreshing(3u8), DataStatus::new(Some(3), true));
        assert_eq!(DataStatus::present(3u8), DataStatus::loaded(Some(3)));
        assert_eq!(DataStatus::<u8>::absent(), DataStatus::loaded(None));
    }

    #[test]
    fn loading_may_carry_stale_data() {
        let status = DataStatus::refreshing("stale");
        assert!(status.is_loading);
        assert_eq!(status.data(), Some(&"stale"));
        assert!(!status.is_settled());
    }

    #[test]
    fn map_keeps_loading_flag() {
        let status = DataStatus::refreshing(2u32).map(|v| v * 10);
        assert_eq!(status, DataStatus::refreshing(20));
    }
}
