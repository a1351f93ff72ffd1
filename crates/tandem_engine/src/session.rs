//! Owner-identity scoped sessions.
//!
//! An engine must not outlive the identity it was started for. A session
//! watches the owner identity and, whenever it changes:
//! 1. Shuts down the current engine, cancelling its subscriptions
//! 2. Re-subscribes both stores under the new owner
//! 3. Builds a resolver for the new owner
//! 4. Spawns a fresh engine publishing into the same outputs
//!
//! Without an owner the session runs against the anonymous local row with
//! sync disabled and never subscribes to the remote store.

use crate::config::EngineConfig;
use crate::engine::{OutputChannels, SyncEngine, SyncOutputs};
use crate::error::{EngineError, EngineResult};
use crate::source::{silent, LocalStore, RemoteStore};
use std::sync::Arc;
use tandem_core::{OwnerKey, Resolver, SyncView};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct Binding<T, R: ?Sized> {
    config: EngineConfig,
    handle: Handle,
    local: Arc<dyn LocalStore<T>>,
    remote: Arc<dyn RemoteStore<T>>,
    factory: Arc<dyn Fn(Option<OwnerKey>) -> Arc<R> + Send + Sync>,
    outputs: Arc<OutputChannels<T>>,
}

impl<T, R> Binding<T, R>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    R: Resolver<T> + ?Sized + 'static,
{
    fn start(&self, owner: Option<OwnerKey>) -> SyncEngine<T> {
        let key = owner.clone().unwrap_or_else(OwnerKey::anonymous);
        let local = self.local.observe(&key);
        let (remote, sync_enabled) = match &owner {
            Some(owner) => (self.remote.observe(owner), true),
            None => (silent(), false),
        };
        let (_enabled_tx, enabled_rx) = watch::channel(sync_enabled);

        info!(entity = %self.config.entity, owner = %key, sync_enabled, "starting sync engine");
        self.outputs.publish(SyncView::default());
        SyncEngine::spawn_with_outputs(
            self.config.clone(),
            &self.handle,
            local,
            remote,
            enabled_rx,
            (self.factory)(owner),
            Arc::clone(&self.outputs),
        )
    }
}

/// A reconciliation session that follows the owner identity.
pub struct SyncSession<T> {
    outputs: SyncOutputs<T>,
    active_owner: watch::Receiver<Option<OwnerKey>>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl<T> SyncSession<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Spawns a session on `handle`.
    ///
    /// `factory` builds the resolver for an owner (`None` when signed out).
    pub fn spawn<R, F>(
        config: EngineConfig,
        handle: &Handle,
        local: Arc<dyn LocalStore<T>>,
        remote: Arc<dyn RemoteStore<T>>,
        mut owner: watch::Receiver<Option<OwnerKey>>,
        factory: F,
    ) -> Self
    where
        R: Resolver<T> + ?Sized + 'static,
        F: Fn(Option<OwnerKey>) -> Arc<R> + Send + Sync + 'static,
    {
        let (channels, outputs) = OutputChannels::new();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let initial_owner = owner.borrow_and_update().clone();
        let (active_tx, active_rx) = watch::channel(initial_owner.clone());

        let binding = Binding {
            config,
            handle: handle.clone(),
            local,
            remote,
            factory: Arc::new(factory),
            outputs: Arc::new(channels),
        };

        let task = handle.spawn(async move {
            let mut current = initial_owner;
            let mut engine = binding.start(current.clone());
            let mut owner_open = true;

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    changed = owner.changed(), if owner_open => {
                        if changed.is_err() {
                            owner_open = false;
                            continue;
                        }
                        let next = owner.borrow_and_update().clone();
                        if next == current {
                            continue;
                        }
                        if let Err(error) = engine.shutdown().await {
                            warn!(%error, "previous engine did not stop cleanly");
                        }
                        current = next;
                        engine = binding.start(current.clone());
                        active_tx.send_replace(current.clone());
                    }
                }
            }

            if let Err(error) = engine.shutdown().await {
                warn!(%error, "engine did not stop cleanly");
            }
        });

        Self {
            outputs,
            active_owner: active_rx,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    /// Receivers for the session outputs. Valid across identity changes.
    pub fn outputs(&self) -> SyncOutputs<T> {
        self.outputs.clone()
    }

    /// The owner the running engine is bound to.
    pub fn active_owner(&self) -> watch::Receiver<Option<OwnerKey>> {
        self.active_owner.clone()
    }

    /// Stops the running engine and the session task.
    pub async fn shutdown(mut self) -> EngineResult<()> {
        self.shutdown.send_replace(true);
        match self.task.take() {
            Some(task) => task.await.map_err(|e| EngineError::Task(e.to_string())),
            None => Err(EngineError::ShutDown),
        }
    }
}

impl<T> Drop for SyncSession<T> {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
