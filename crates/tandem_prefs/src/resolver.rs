//! Resolver for user preferences.

use crate::preferences::UserPreferences;
use std::sync::Arc;
use tandem_core::{resolve_by_freshness, OwnerKey, ResolvedState, Resolver};
use tandem_engine::{Dispatcher, LocalStore, RemoteStore};
use tracing::warn;

/// Resolver binding preferences to one session owner.
///
/// Writes go through the dispatcher and never block the engine. The owner
/// guards keep a session from uploading rows it does not own:
/// - Without a signed-in owner nothing is uploaded
/// - Anonymous and foreign rows are never uploaded
/// - Foreign rows are never written to the local cache
pub struct PreferencesResolver {
    owner: Option<OwnerKey>,
    local: Arc<dyn LocalStore<UserPreferences>>,
    remote: Arc<dyn RemoteStore<UserPreferences>>,
    dispatcher: Dispatcher,
}

impl PreferencesResolver {
    /// Creates a resolver for the session of `owner` (`None` when signed out).
    pub fn new(
        owner: Option<OwnerKey>,
        local: Arc<dyn LocalStore<UserPreferences>>,
        remote: Arc<dyn RemoteStore<UserPreferences>>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            owner,
            local,
            remote,
            dispatcher,
        }
    }

    /// The signed-in owner, if any.
    pub fn owner(&self) -> Option<&OwnerKey> {
        self.owner.as_ref()
    }

    /// Key of the local row this session reads and writes.
    fn session_key(&self) -> OwnerKey {
        self.owner.clone().unwrap_or_else(OwnerKey::anonymous)
    }
}

impl Resolver<UserPreferences> for PreferencesResolver {
    fn upload_to_remote(&self, value: UserPreferences) {
        let Some(owner) = &self.owner else {
            warn!(row_owner = %value.owner, "refusing upload: no signed-in owner");
            return;
        };
        if value.owner.is_anonymous() || value.owner != *owner {
            warn!(
                %owner,
                row_owner = %value.owner,
                "refusing upload of a row the session does not own"
            );
            return;
        }

        let remote = Arc::clone(&self.remote);
        self.dispatcher
            .dispatch("upload_preferences", move || remote.upload(value));
    }

    fn upsert_to_local(&self, value: UserPreferences) {
        let key = self.session_key();
        if value.owner != key {
            warn!(owner = %key, row_owner = %value.owner, "refusing to cache a foreign row");
            return;
        }

        let local = Arc::clone(&self.local);
        self.dispatcher
            .dispatch("upsert_preferences", move || local.upsert(value));
    }

    fn create_default_instance(&self) -> UserPreferences {
        UserPreferences::new(self.session_key())
    }

    fn resolve(&self, local: &UserPreferences, remote: &UserPreferences) -> ResolvedState {
        resolve_by_freshness(local, remote)
    }

    fn should_sync_data(&self, data: Option<&UserPreferences>) -> bool {
        match (data, &self.owner) {
            (Some(prefs), Some(owner)) => !prefs.owner.is_anonymous() && prefs.owner == *owner,
            _ => false,
        }
    }
}
