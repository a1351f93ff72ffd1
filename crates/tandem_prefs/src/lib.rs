//! # Tandem Preferences
//!
//! User preferences kept in sync between a local cache and a remote store.
//!
//! This crate provides:
//! - `UserPreferences`, the synchronized entity
//! - `PreferencesResolver`, which guards writes by owner identity
//! - `spawn_session`, which wires both stores into a `SyncSession`
//!
//! ## Example
//!
//! ```rust,ignore
//! let session = tandem_prefs::spawn_session(&handle, local, remote, owner_rx);
//! let mut prefs = session.outputs().value();
//! prefs.changed().await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod preferences;
mod resolver;

pub use preferences::{DistanceUnit, Theme, UserPreferences};
pub use resolver::PreferencesResolver;

use std::sync::Arc;
use tandem_core::OwnerKey;
use tandem_engine::{Dispatcher, EngineConfig, LocalStore, RemoteStore, SyncSession};
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Entity name used in engine logs.
pub const ENTITY: &str = "user_preferences";

/// Spawns a preferences session that follows `owner`.
///
/// Every identity change builds a fresh `PreferencesResolver`; store writes
/// run on the blocking pool of `handle`.
pub fn spawn_session(
    handle: &Handle,
    local: Arc<dyn LocalStore<UserPreferences>>,
    remote: Arc<dyn RemoteStore<UserPreferences>>,
    owner: watch::Receiver<Option<OwnerKey>>,
) -> SyncSession<UserPreferences> {
    let dispatcher = Dispatcher::new(handle.clone());
    let factory_local = Arc::clone(&local);
    let factory_remote = Arc::clone(&remote);

    SyncSession::spawn(
        EngineConfig::new(ENTITY),
        handle,
        local,
        remote,
        owner,
        move |owner| {
            Arc::new(PreferencesResolver::new(
                owner,
                Arc::clone(&factory_local),
                Arc::clone(&factory_remote),
                dispatcher.clone(),
            ))
        },
    )
}
