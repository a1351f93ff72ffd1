//! Decide command implementation.
//!
//! Runs one reconciliation pass over preferences rows described on the
//! command line. Nothing is written: the decided action is only reported.

use super::{CliError, Format};
use serde::Serialize;
use std::sync::Arc;
use tandem_core::{DataStatus, Freshness, OwnerKey, SyncInputs, SyncView};
use tandem_engine::{Dispatcher, LocalStore, MemoryLocalStore, MemoryRemoteStore, RemoteStore};
use tandem_prefs::{PreferencesResolver, UserPreferences};
use tracing::debug;

/// Outcome of one pass.
#[derive(Debug, Serialize)]
pub struct DecideReport {
    /// Local source as given.
    pub local: String,
    /// Remote source as given.
    pub remote: String,
    /// Whether sync was enabled.
    pub sync_enabled: bool,
    /// The resolved value.
    pub value: Option<UserPreferences>,
    /// Name of the decided action.
    pub action: Option<&'static str>,
    /// Freshness of the row the action carries.
    pub action_freshness: Option<u64>,
    /// Derived loading flag.
    pub is_loading: Option<bool>,
    /// Derived synced flag.
    pub is_data_synced: bool,
    /// Derived can-sync flag.
    pub can_sync_data: bool,
    /// Derived eligibility flag.
    pub should_sync_data: bool,
}

/// Parses a source status argument.
///
/// `unknown` means the source never emitted, `loading` and `none` are the
/// empty loading and settled states, `<n>` is a settled row with freshness
/// `n` and `loading:<n>` a row shown while a refresh is in flight.
pub fn parse_status(
    arg: &str,
    owner: &OwnerKey,
) -> Result<Option<DataStatus<UserPreferences>>, CliError> {
    let row = |n: &str| {
        n.parse::<u64>()
            .map(|at| UserPreferences::new(owner.clone()).at(Freshness::new(at)))
            .map_err(|_| CliError::InvalidStatus(arg.to_string()))
    };

    match arg {
        "unknown" => Ok(None),
        "loading" => Ok(Some(DataStatus::loading())),
        "none" => Ok(Some(DataStatus::absent())),
        _ => match arg.strip_prefix("loading:") {
            Some(n) => Ok(Some(DataStatus::refreshing(row(n)?))),
            None => Ok(Some(DataStatus::present(row(arg)?))),
        },
    }
}

/// Runs the decision table and projections without side effects.
pub fn evaluate(
    local: &str,
    remote: &str,
    sync_enabled: bool,
    owner: &str,
) -> Result<DecideReport, CliError> {
    let owner = OwnerKey::new(owner);
    let inputs = SyncInputs::new(
        parse_status(local, &owner)?,
        parse_status(remote, &owner)?,
        sync_enabled,
    );

    let resolver = PreferencesResolver::new(
        Some(owner),
        Arc::new(MemoryLocalStore::new()) as Arc<dyn LocalStore<UserPreferences>>,
        Arc::new(MemoryRemoteStore::new()) as Arc<dyn RemoteStore<UserPreferences>>,
        Dispatcher::inline(),
    );
    let outcome = inputs.decide(&resolver);
    debug!(?inputs, action = outcome.action.as_ref().map(|a| a.name()), "evaluated");
    let view = SyncView::project(&inputs, outcome.value.clone(), &resolver);

    Ok(DecideReport {
        local: local.to_string(),
        remote: remote.to_string(),
        sync_enabled,
        action: outcome.action.as_ref().map(|a| a.name()),
        action_freshness: outcome
            .action
            .as_ref()
            .and_then(|a| a.payload())
            .map(|row| row.updated_at.as_millis()),
        value: view.value,
        is_loading: view.is_loading,
        is_data_synced: view.is_data_synced,
        can_sync_data: view.can_sync_data,
        should_sync_data: view.should_sync_data,
    })
}

/// Runs the decide command.
pub fn run(
    local: &str,
    remote: &str,
    sync_enabled: bool,
    owner: &str,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = evaluate(local, remote, sync_enabled, owner)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &DecideReport) {
    println!("Tandem Reconciliation");
    println!("=====================");
    println!();
    println!("Inputs:");
    println!("  local:        {}", report.local);
    println!("  remote:       {}", report.remote);
    println!("  sync enabled: {}", report.sync_enabled);
    println!();
    println!("Outcome:");
    match &report.value {
        Some(value) => println!("  value:  {} ({})", value.owner, value.updated_at),
        None => println!("  value:  none"),
    }
    match (report.action, report.action_freshness) {
        (Some(action), Some(at)) => println!("  action: {action} (fresh:{at})"),
        (Some(action), None) => println!("  action: {action}"),
        (None, _) => println!("  action: none"),
    }
    println!();
    println!("Projections:");
    let loading = report.is_loading.map_or_else(|| "unknown".to_string(), |l| l.to_string());
    println!("  is_loading:       {loading}");
    println!("  is_data_synced:   {}", report.is_data_synced);
    println!("  can_sync_data:    {}", report.can_sync_data);
    println!("  should_sync_data: {}", report.should_sync_data);
}
