//! Inspect command implementation.

use super::Format;
use serde::Serialize;
use std::path::Path;
use tandem_core::OwnerKey;
use tandem_prefs::UserPreferences;
use tandem_store::{FileLocalStore, FileStoreConfig, StoreResult};
use tracing::debug;

/// Cache inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub path: String,
    /// One entry per owner with a row file.
    pub rows: Vec<RowReport>,
}

/// A single cached row.
#[derive(Debug, Serialize)]
pub struct RowReport {
    /// Owner key.
    pub owner: String,
    /// The decoded row, if readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<UserPreferences>,
    /// Why the row could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reads the rows of a preferences cache.
///
/// The store directory must exist; it is never created. Opening takes the
/// store lock, so a running application holding it is reported as an error.
pub fn collect(path: &Path, owner: Option<&str>) -> StoreResult<InspectResult> {
    let config = FileStoreConfig::new(path).with_create_if_missing(false);
    let store = FileLocalStore::<UserPreferences>::open(config)?;

    let owners = match owner {
        Some(owner) => vec![OwnerKey::new(owner)],
        None => store.owners()?,
    };
    debug!(path = %path.display(), owners = owners.len(), "inspecting cache");

    let rows = owners
        .into_iter()
        .map(|owner| match store.load(&owner) {
            Ok(preferences) => RowReport {
                owner: owner.to_string(),
                preferences,
                error: None,
            },
            Err(e) => RowReport {
                owner: owner.to_string(),
                preferences: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok(InspectResult {
        path: path.display().to_string(),
        rows,
    })
}

/// Runs the inspect command.
pub fn run(
    path: &Path,
    owner: Option<&str>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(path, owner)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Tandem Cache Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!("Rows: {}", result.rows.len());

    for row in &result.rows {
        println!();
        println!("[{}]", row.owner);
        match (&row.preferences, &row.error) {
            (Some(prefs), _) => {
                println!("  updated_at:    {}", prefs.updated_at);
                println!("  theme:         {}", prefs.theme);
                println!("  distance unit: {}", prefs.distance_unit);
                println!("  locale:        {}", prefs.locale);
                println!("  notifications: {}", prefs.notifications_enabled);
                println!("  share location: {}", prefs.share_location);
            }
            (None, Some(error)) => println!("  error: {error}"),
            (None, None) => println!("  (no row)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::Freshness;
    use tandem_engine::LocalStore;
    use tandem_store::StoreError;
    use tempfile::tempdir;

    fn populate(path: &Path) {
        let store = FileLocalStore::<UserPreferences>::open(FileStoreConfig::new(path)).unwrap();
        store
            .upsert(UserPreferences::new(OwnerKey::new("alice")).at(Freshness::new(3)))
            .unwrap();
        store.upsert(UserPreferences::new(OwnerKey::anonymous())).unwrap();
    }

    #[test]
    fn lists_every_row() {
        let temp = tempdir().unwrap();
        populate(temp.path());

        let result = collect(temp.path(), None).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert!(result.rows.iter().all(|r| r.preferences.is_some()));
    }

    #[test]
    fn filters_by_owner() {
        let temp = tempdir().unwrap();
        populate(temp.path());

        let result = collect(temp.path(), Some("alice")).unwrap();
        assert_eq!(result.rows.len(), 1);
        let prefs = result.rows[0].preferences.as_ref().unwrap();
        assert_eq!(prefs.updated_at, Freshness::new(3));

        let missing = collect(temp.path(), Some("bob")).unwrap();
        assert!(missing.rows[0].preferences.is_none());
        assert!(missing.rows[0].error.is_none());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = tempdir().unwrap();
        assert!(matches!(
            collect(&temp.path().join("nope"), None),
            Err(StoreError::InvalidLayout(_))
        ));
    }
}
