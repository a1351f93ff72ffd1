//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for a sync engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name of the synchronized entity, used in logs.
    pub entity: String,
    /// Whether to suppress an action identical to the last one dispatched
    /// while the inputs have not converged.
    pub suppress_repeated_actions: bool,
    /// How long `shutdown` waits for the engine task before aborting it.
    pub shutdown_timeout: Duration,
}

impl EngineConfig {
    /// Creates a configuration for the named entity.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            suppress_repeated_actions: true,
            shutdown_timeout: Duration::from_secs(5),
        }
    }

    /// Sets whether repeated actions are suppressed.
    #[must_use]
    pub fn with_suppress_repeated_actions(mut self, suppress: bool) -> Self {
        self.suppress_repeated_actions = suppress;
        self
    }

    /// Sets the shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("entity")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.entity, "entity");
        assert!(config.suppress_repeated_actions);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_builder() {
        let config = EngineConfig::new("preferences")
            .with_suppress_repeated_actions(false)
            .with_shutdown_timeout(Duration::from_millis(250));

        assert_eq!(config.entity, "preferences");
        assert!(!config.suppress_repeated_actions);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(250));
    }
}
