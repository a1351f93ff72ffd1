//! The user preferences entity.

use serde::{Deserialize, Serialize};
use std::fmt;
use tandem_core::{Freshness, OwnerKey, SyncEntity};

/// Color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Follow the platform setting.
    #[default]
    System,
    /// Light theme.
    Light,
    /// Dark theme.
    Dark,
}

/// Unit used to display distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    /// Kilometers.
    #[default]
    Kilometers,
    /// Miles.
    Miles,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kilometers => write!(f, "km"),
            Self::Miles => write!(f, "mi"),
        }
    }
}

/// Per-owner user preferences.
///
/// Fields are public for reading; edits go through the setters, which move
/// `updated_at` strictly forward so the edit wins the next resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Owner of the row.
    pub owner: OwnerKey,
    /// Freshness marker of the last edit.
    pub updated_at: Freshness,
    /// Color theme.
    pub theme: Theme,
    /// Distance unit.
    pub distance_unit: DistanceUnit,
    /// BCP 47 locale tag.
    pub locale: String,
    /// Whether notifications are enabled.
    pub notifications_enabled: bool,
    /// Whether location sharing is enabled.
    pub share_location: bool,
}

impl UserPreferences {
    /// Default preferences for `owner`.
    ///
    /// Defaults carry `Freshness::ZERO`, so any real edit made on another
    /// device wins against them.
    pub fn new(owner: OwnerKey) -> Self {
        Self {
            owner,
            updated_at: Freshness::ZERO,
            theme: Theme::default(),
            distance_unit: DistanceUnit::default(),
            locale: "en-US".to_string(),
            notifications_enabled: true,
            share_location: false,
        }
    }

    /// Returns a copy with an explicit freshness marker.
    #[must_use]
    pub fn at(mut self, updated_at: Freshness) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Sets the theme.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.touch();
    }

    /// Sets the distance unit.
    pub fn set_distance_unit(&mut self, unit: DistanceUnit) {
        self.distance_unit = unit;
        self.touch();
    }

    /// Sets the locale.
    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
        self.touch();
    }

    /// Enables or disables notifications.
    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
        self.touch();
    }

    /// Enables or disables location sharing.
    pub fn set_share_location(&mut self, share: bool) {
        self.share_location = share;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Freshness::after(self.updated_at);
    }
}

impl SyncEntity for UserPreferences {
    fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    fn freshness(&self) -> Freshness {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let prefs = UserPreferences::new(OwnerKey::new("alice"));
        assert_eq!(prefs.updated_at, Freshness::ZERO);
        assert_eq!(prefs.theme, Theme::System);
        assert_eq!(prefs.distance_unit, DistanceUnit::Kilometers);
        assert!(prefs.notifications_enabled);
        assert!(!prefs.share_location);
    }

    #[test]
    fn setters_move_freshness_forward() {
        let mut prefs = UserPreferences::new(OwnerKey::new("alice"));
        let mut previous = prefs.updated_at;

        prefs.set_theme(Theme::Dark);
        assert!(prefs.updated_at > previous);
        previous = prefs.updated_at;

        prefs.set_distance_unit(DistanceUnit::Miles);
        assert!(prefs.updated_at > previous);
        previous = prefs.updated_at;

        prefs.set_locale("fr-FR");
        prefs.set_notifications_enabled(false);
        prefs.set_share_location(true);
        assert!(prefs.updated_at > previous);
        assert_eq!(prefs.locale, "fr-FR");
    }

    #[test]
    fn edits_survive_a_stalled_clock() {
        let far_future = Freshness::new(u64::MAX / 2);
        let mut prefs = UserPreferences::new(OwnerKey::new("alice")).at(far_future);
        prefs.set_theme(Theme::Light);
        assert_eq!(prefs.updated_at, far_future.next());
    }

    #[test]
    fn display_names() {
        assert_eq!(Theme::Dark.to_string(), "dark");
        assert_eq!(DistanceUnit::Miles.to_string(), "mi");
    }
}
