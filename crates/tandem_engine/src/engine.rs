//! The reactive reconciliation engine.
//!
//! One engine runs per entity and owner session. It is a single tokio task
//! that waits on the local, remote and sync-enabled streams, and on every
//! change:
//! 1. Reads the latest `(local, remote, sync_enabled)` triple
//! 2. Runs the decision table
//! 3. Fires the corrective action through the resolver (at most one)
//! 4. Republishes the resolved value and the derived projections
//!
//! The engine holds no entity state of its own between passes apart from the
//! action gate; every pass re-derives its result from the current inputs.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gate::ActionGate;
use crate::source::StatusReceiver;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tandem_core::{Reconciliation, Resolver, SyncAction, SyncInputs, SyncView};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Statistics about engine passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Number of reconciliation passes run.
    pub passes: u64,
    /// Number of uploads dispatched.
    pub uploads_dispatched: u64,
    /// Number of local upserts dispatched (excluding defaults).
    pub local_upserts_dispatched: u64,
    /// Number of default rows created.
    pub defaults_created: u64,
    /// Number of actions suppressed as repeats.
    pub actions_suppressed: u64,
    /// Time of the last pass.
    pub last_pass: Option<Instant>,
}

impl SyncStats {
    fn record_action<T>(&mut self, action: &SyncAction<T>) {
        match action {
            SyncAction::CreateDefault => self.defaults_created += 1,
            SyncAction::UpsertLocal(_) => self.local_upserts_dispatched += 1,
            SyncAction::UploadRemote(_) => self.uploads_dispatched += 1,
        }
    }
}

/// Receivers for everything an engine exposes.
///
/// Each receiver is only woken when its value actually changes.
#[derive(Debug, Clone)]
pub struct SyncOutputs<T> {
    value: watch::Receiver<Option<T>>,
    is_loading: watch::Receiver<Option<bool>>,
    is_data_synced: watch::Receiver<bool>,
    can_sync_data: watch::Receiver<bool>,
    should_sync_data: watch::Receiver<bool>,
}

impl<T: Clone> SyncOutputs<T> {
    /// The resolved value.
    pub fn value(&self) -> watch::Receiver<Option<T>> {
        self.value.clone()
    }

    /// Whether the relevant sources are loading (`None` while unknown).
    pub fn is_loading(&self) -> watch::Receiver<Option<bool>> {
        self.is_loading.clone()
    }

    /// Whether local and remote hold the same eligible row.
    pub fn is_data_synced(&self) -> watch::Receiver<bool> {
        self.is_data_synced.clone()
    }

    /// Whether a sync could run right now.
    pub fn can_sync_data(&self) -> watch::Receiver<bool> {
        self.can_sync_data.clone()
    }

    /// Whether the local row is eligible for synchronization.
    pub fn should_sync_data(&self) -> watch::Receiver<bool> {
        self.should_sync_data.clone()
    }

    /// Reads the current value of every output.
    pub fn snapshot(&self) -> SyncView<T> {
        SyncView {
            value: self.value.borrow().clone(),
            is_loading: *self.is_loading.borrow(),
            is_data_synced: *self.is_data_synced.borrow(),
            can_sync_data: *self.can_sync_data.borrow(),
            should_sync_data: *self.should_sync_data.borrow(),
        }
    }
}

/// Senders behind `SyncOutputs`, shared by every engine of a session.
#[derive(Debug)]
pub(crate) struct OutputChannels<T> {
    value: watch::Sender<Option<T>>,
    is_loading: watch::Sender<Option<bool>>,
    is_data_synced: watch::Sender<bool>,
    can_sync_data: watch::Sender<bool>,
    should_sync_data: watch::Sender<bool>,
}

fn replace_if_changed<V: PartialEq>(tx: &watch::Sender<V>, next: V) {
    tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

impl<T: PartialEq> OutputChannels<T> {
    pub(crate) fn new() -> (Self, SyncOutputs<T>) {
        let (value, value_rx) = watch::channel(None);
        let (is_loading, is_loading_rx) = watch::channel(None);
        let (is_data_synced, is_data_synced_rx) = watch::channel(false);
        let (can_sync_data, can_sync_data_rx) = watch::channel(false);
        let (should_sync_data, should_sync_data_rx) = watch::channel(false);

        let channels = Self {
            value,
            is_loading,
            is_data_synced,
            can_sync_data,
            should_sync_data,
        };
        let outputs = SyncOutputs {
            value: value_rx,
            is_loading: is_loading_rx,
            is_data_synced: is_data_synced_rx,
            can_sync_data: can_sync_data_rx,
            should_sync_data: should_sync_data_rx,
        };
        (channels, outputs)
    }

    pub(crate) fn subscribe(&self) -> SyncOutputs<T> {
        SyncOutputs {
            value: self.value.subscribe(),
            is_loading: self.is_loading.subscribe(),
            is_data_synced: self.is_data_synced.subscribe(),
            can_sync_data: self.can_sync_data.subscribe(),
            should_sync_data: self.should_sync_data.subscribe(),
        }
    }

    pub(crate) fn publish(&self, view: SyncView<T>) {
        replace_if_changed(&self.value, view.value);
        replace_if_changed(&self.is_loading, view.is_loading);
        replace_if_changed(&self.is_data_synced, view.is_data_synced);
        replace_if_changed(&self.can_sync_data, view.can_sync_data);
        replace_if_changed(&self.should_sync_data, view.should_sync_data);
    }
}

/// Per-pass state of a running engine.
struct PassState<T, R: ?Sized> {
    config: EngineConfig,
    resolver: Arc<R>,
    gate: ActionGate<T>,
    outputs: Arc<OutputChannels<T>>,
    stats: Arc<RwLock<SyncStats>>,
}

impl<T, R> PassState<T, R>
where
    T: Clone + PartialEq,
    R: Resolver<T> + ?Sized,
{
    fn pass(&mut self, inputs: SyncInputs<T>) {
        let Reconciliation { value, action } = inputs.decide(&*self.resolver);

        if self.gate.admit(action.as_ref()) {
            if let Some(action) = action {
                debug!(
                    entity = %self.config.entity,
                    action = action.name(),
                    "dispatching sync action"
                );
                self.stats.write().record_action(&action);
                action.apply(&*self.resolver);
            }
        } else if let Some(action) = &action {
            trace!(
                entity = %self.config.entity,
                action = action.name(),
                "suppressed repeated action"
            );
            self.stats.write().actions_suppressed += 1;
        }

        let view = SyncView::project(&inputs, value, &*self.resolver);
        self.outputs.publish(view);

        let mut stats = self.stats.write();
        stats.passes += 1;
        stats.last_pass = Some(Instant::now());
    }
}

/// The engine task: input streams plus pass state.
struct EngineTask<T, R: ?Sized> {
    local: StatusReceiver<T>,
    remote: StatusReceiver<T>,
    sync_enabled: watch::Receiver<bool>,
    shutdown: watch::Receiver<bool>,
    state: PassState<T, R>,
}

impl<T, R> EngineTask<T, R>
where
    T: Clone + PartialEq,
    R: Resolver<T> + ?Sized,
{
    async fn run(self) {
        let EngineTask {
            mut local,
            mut remote,
            mut sync_enabled,
            mut shutdown,
            mut state,
        } = self;

        let entity = state.config.entity.clone();
        debug!(%entity, "sync engine started");

        let mut local_open = true;
        let mut remote_open = true;
        let mut enabled_open = true;
        let mut changed = true;

        loop {
            // A closed stream keeps its last value; only real changes rerun.
            if changed {
                let inputs = SyncInputs::new(
                    local.borrow_and_update().clone(),
                    remote.borrow_and_update().clone(),
                    *sync_enabled.borrow_and_update(),
                );
                state.pass(inputs);
            }

            changed = tokio::select! {
                biased;
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                    false
                }
                result = local.changed(), if local_open => {
                    if result.is_err() {
                        trace!(%entity, "local stream closed");
                        local_open = false;
                    }
                    result.is_ok()
                }
                result = remote.changed(), if remote_open => {
                    if result.is_err() {
                        trace!(%entity, "remote stream closed");
                        remote_open = false;
                    }
                    result.is_ok()
                }
                result = sync_enabled.changed(), if enabled_open => {
                    if result.is_err() {
                        enabled_open = false;
                    }
                    result.is_ok()
                }
            };
        }

        debug!(%entity, "sync engine stopped");
    }
}

/// Handle to a running reconciliation engine.
///
/// Dropping the handle stops the engine. Use `shutdown` to stop it and wait
/// for the task to finish.
pub struct SyncEngine<T> {
    config: EngineConfig,
    outputs: SyncOutputs<T>,
    stats: Arc<RwLock<SyncStats>>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl<T> SyncEngine<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Spawns an engine on `handle`.
    pub fn spawn<R>(
        config: EngineConfig,
        handle: &Handle,
        local: StatusReceiver<T>,
        remote: StatusReceiver<T>,
        sync_enabled: watch::Receiver<bool>,
        resolver: Arc<R>,
    ) -> Self
    where
        R: Resolver<T> + ?Sized + 'static,
    {
        let (channels, _) = OutputChannels::new();
        Self::spawn_with_outputs(
            config,
            handle,
            local,
            remote,
            sync_enabled,
            resolver,
            Arc::new(channels),
        )
    }

    pub(crate) fn spawn_with_outputs<R>(
        config: EngineConfig,
        handle: &Handle,
        local: StatusReceiver<T>,
        remote: StatusReceiver<T>,
        sync_enabled: watch::Receiver<bool>,
        resolver: Arc<R>,
        outputs: Arc<OutputChannels<T>>,
    ) -> Self
    where
        R: Resolver<T> + ?Sized + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(RwLock::new(SyncStats::default()));
        let receivers = outputs.subscribe();

        let task = EngineTask {
            local,
            remote,
            sync_enabled,
            shutdown: shutdown_rx,
            state: PassState {
                gate: ActionGate::new(config.suppress_repeated_actions),
                config: config.clone(),
                resolver,
                outputs,
                stats: Arc::clone(&stats),
            },
        };

        Self {
            config,
            outputs: receivers,
            stats,
            shutdown: shutdown_tx,
            task: Some(handle.spawn(task.run())),
        }
    }

    /// Receivers for the engine outputs.
    pub fn outputs(&self) -> SyncOutputs<T> {
        self.outputs.clone()
    }

    /// Current statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns true while the engine task is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the engine and waits for its task to finish.
    ///
    /// Aborts the task if it does not stop within the configured timeout.
    pub async fn shutdown(mut self) -> EngineResult<()> {
        self.shutdown.send_replace(true);
        let Some(mut task) = self.task.take() else {
            return Err(EngineError::ShutDown);
        };

        match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(join_error)) => Err(EngineError::Task(join_error.to_string())),
            Err(_) => {
                warn!(entity = %self.config.entity, "engine did not stop in time; aborting");
                task.abort();
                Err(EngineError::Task("shutdown timed out".into()))
            }
        }
    }
}

impl<T> Drop for SyncEngine<T> {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
