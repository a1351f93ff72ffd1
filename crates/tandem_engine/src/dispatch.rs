//! Fire-and-forget execution of store writes.

use crate::error::{EngineError, EngineResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Where dispatched writes run.
#[derive(Debug, Clone)]
enum Mode {
    /// On the blocking pool of a tokio runtime.
    Background(Handle),
    /// On the calling thread.
    Inline,
}

/// Counters kept by a dispatcher.
#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicU64,
    failed: AtomicU64,
}

/// Runs store writes off the reconciliation path.
///
/// Resolvers hand their writes to a dispatcher so that `upload_to_remote`
/// and `upsert_to_local` never block the engine. Failures are logged and
/// counted; their effect is observed through the next status emission of
/// the store, never returned to the caller.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    mode: Mode,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Dispatches onto the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self {
            mode: Mode::Background(handle),
            counters: Arc::default(),
        }
    }

    /// Dispatches onto the runtime of the calling task.
    pub fn current() -> EngineResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| EngineError::Task(e.to_string()))
    }

    /// Runs writes on the calling thread.
    ///
    /// Meant for tools and tests that want writes to complete before the
    /// call returns.
    pub fn inline() -> Self {
        Self {
            mode: Mode::Inline,
            counters: Arc::default(),
        }
    }

    /// Runs `op` in the background, logging a failure.
    pub fn dispatch<F>(&self, label: &'static str, op: F)
    where
        F: FnOnce() -> EngineResult<()> + Send + 'static,
    {
        self.counters.dispatched.fetch_add(1, Ordering::SeqCst);
        let counters = Arc::clone(&self.counters);
        let run = move || match op() {
            Ok(()) => debug!(label, "dispatched write completed"),
            Err(error) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!(label, %error, transient = error.is_transient(), "dispatched write failed");
            }
        };

        match &self.mode {
            Mode::Background(handle) => {
                handle.spawn_blocking(run);
            }
            Mode::Inline => run(),
        }
    }

    /// Number of writes handed to this dispatcher.
    pub fn dispatched(&self) -> u64 {
        self.counters.dispatched.load(Ordering::SeqCst)
    }

    /// Number of dispatched writes that failed.
    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::SeqCst)
    }
}
