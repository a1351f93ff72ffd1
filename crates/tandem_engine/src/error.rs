//! Error types for the engine and its store adapters.

use thiserror::Error;

/// Result type for engine and store operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by stores and the engine lifecycle.
///
/// The reconciliation core itself never raises. These errors stay at the
/// collaborator boundary: a failed dispatched write is logged and surfaces
/// through the store's own status stream.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The store could not be reached.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// Error message.
        message: String,
        /// Whether a later attempt may succeed.
        transient: bool,
    },

    /// The store refused the write.
    #[error("write rejected: {0}")]
    WriteRejected(String),

    /// The row or session has no usable owner identity.
    #[error("missing owner identity")]
    MissingOwner,

    /// The write is older than the row already stored.
    #[error("stale write for owner {owner}: stored {stored}, incoming {incoming}")]
    StaleWrite {
        /// Owner of the row.
        owner: String,
        /// Freshness of the stored row.
        stored: u64,
        /// Freshness of the rejected row.
        incoming: u64,
    },

    /// The engine has already been shut down.
    #[error("engine shut down")]
    ShutDown,

    /// A background task failed.
    #[error("task failed: {0}")]
    Task(String),
}

impl EngineError {
    /// Creates a transient unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            transient: true,
        }
    }

    /// Creates a permanent unavailability error.
    pub fn unavailable_fatal(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            transient: false,
        }
    }

    /// Returns true if a later attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::StoreUnavailable { transient, .. } => *transient,
            EngineError::Task(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(EngineError::unavailable("offline").is_transient());
        assert!(!EngineError::unavailable_fatal("revoked").is_transient());
        assert!(EngineError::Task("panicked".into()).is_transient());
        assert!(!EngineError::MissingOwner.is_transient());
        assert!(!EngineError::ShutDown.is_transient());
    }

    #[test]
    fn error_display() {
        let err = EngineError::StaleWrite {
            owner: "alice".into(),
            stored: 20,
            incoming: 10,
        };
        assert_eq!(
            err.to_string(),
            "stale write for owner alice: stored 20, incoming 10"
        );
        assert_eq!(EngineError::MissingOwner.to_string(), "missing owner identity");
    }
}
