//! Configuration for the file store.

use std::path::PathBuf;

/// Configuration for opening a `FileLocalStore`.
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Store directory.
    pub root: PathBuf,
    /// Whether to create the directory if it does not exist.
    pub create_if_missing: bool,
    /// Whether to fsync every row file and the directory on write.
    pub sync_on_write: bool,
}

impl FileStoreConfig {
    /// Creates a configuration for the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            create_if_missing: true,
            sync_on_write: true,
        }
    }

    /// Sets whether a missing directory is created.
    #[must_use]
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Sets whether writes are fsynced.
    #[must_use]
    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self::new("tandem-cache")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = FileStoreConfig::new("/tmp/cache")
            .with_create_if_missing(false)
            .with_sync_on_write(false);

        assert_eq!(config.root, PathBuf::from("/tmp/cache"));
        assert!(!config.create_if_missing);
        assert!(!config.sync_on_write);
    }

    #[test]
    fn defaults_are_durable() {
        let config = FileStoreConfig::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_write);
    }
}
