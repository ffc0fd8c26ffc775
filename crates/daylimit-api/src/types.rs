//! Shared types for the daylimit API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Smallest allowed day limit
pub const MIN_DAY_LIMIT: u32 = 1;

/// Largest day limit the settings menu offers
pub const MAX_DAY_LIMIT: u32 = 50;

/// Day limit used when nothing has been saved
pub const DEFAULT_DAY_LIMIT: u32 = 3;

/// Longest break a user can request, in minutes
pub const MAX_BREAK_MINUTES: u32 = 480;

/// Persisted limiter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterSettings {
    /// Whether day limiting is active
    pub enabled: bool,

    /// On limit reached: return to title (true) or quit the application (false)
    pub exit_to_title: bool,

    /// Maximum number of elapsed days. Always >= 1.
    pub day_limit: u32,

    /// While in the future, break mode keeps the player out until this instant
    pub break_until: Option<DateTime<Utc>>,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            exit_to_title: false,
            day_limit: DEFAULT_DAY_LIMIT,
            break_until: None,
        }
    }
}

impl LimiterSettings {
    /// Overlay the fields set in `patch`, leaving the rest untouched
    pub fn apply_patch(&mut self, patch: &SettingsPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(exit_to_title) = patch.exit_to_title {
            self.exit_to_title = exit_to_title;
        }
        if let Some(day_limit) = patch.day_limit {
            self.day_limit = day_limit;
        }
        if let Some(break_until) = patch.break_until {
            self.break_until = break_until;
        }
    }

    /// Copy of these settings with `patch` overlaid
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut merged = self.clone();
        merged.apply_patch(patch);
        merged
    }
}

/// Partial settings update.
///
/// Each write path only sets the fields it owns, so that merging against the
/// stored snapshot never clobbers another path's edits. For `break_until`,
/// `None` leaves the stored value alone and `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_to_title: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_limit: Option<u32>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_some"
    )]
    pub break_until: Option<Option<DateTime<Utc>>>,
}

impl SettingsPatch {
    /// Patch owned by the break timer: only the deadline
    pub fn break_until(until: Option<DateTime<Utc>>) -> Self {
        Self {
            break_until: Some(until),
            ..Self::default()
        }
    }

    /// Patch owned by the settings UI: exit mode and day limit. The enabled
    /// flag is left as stored, so turning limiting on from the menu lasts
    /// only for the running session.
    pub fn user_fields(settings: &LimiterSettings) -> Self {
        Self {
            enabled: None,
            exit_to_title: Some(settings.exit_to_title),
            day_limit: Some(settings.day_limit),
            break_until: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.exit_to_title.is_none()
            && self.day_limit.is_none()
            && self.break_until.is_none()
    }
}

// Distinguishes an explicit `null` (clear) from an absent field (leave alone).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Message keys the host translates and displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    /// Break is running; params: [minutes remaining]
    OnBreak,
    /// Last allowed day; params: [days remaining]
    FinalDay,
    /// Day limit reached, the session will end
    ShutDown,
    /// No break time remaining
    BreakRemainingNone,
}

/// Limiter phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimiterPhase {
    /// Limiting disabled
    Idle,
    /// Enabled, days remaining
    Counting,
    /// Enabled, on the last allowed day (warning shown)
    FinalDayWarned,
    /// Limit reached; the session must end
    LimitReached,
    /// Break running; overrides every other phase
    BreakMode,
}

/// How the host should leave the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitMode {
    ToTitle,
    Quit,
}

/// A single settings edit coming from the settings UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ConfigField {
    Enabled(bool),
    ExitToTitle(bool),
    DayLimit(u32),
    /// Requested break length; committed by `SettingsApplied`
    BreakMinutes(u32),
    /// Lock further edits until reset; only takes effect while enabled
    PreventChanging(bool),
}

impl ConfigField {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigField::Enabled(_) => "enabled",
            ConfigField::ExitToTitle(_) => "exit_to_title",
            ConfigField::DayLimit(_) => "day_limit",
            ConfigField::BreakMinutes(_) => "break_minutes",
            ConfigField::PreventChanging(_) => "prevent_changing",
        }
    }
}

/// Status view for settings menus and diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterStatus {
    pub phase: LimiterPhase,
    pub session_loaded: bool,
    pub enabled: bool,
    pub exit_to_title: bool,
    pub day_count: u32,
    pub day_limit: u32,
    /// Days left before the limit. None when disabled or no session is loaded.
    pub days_remaining: Option<u32>,
    pub break_until: Option<DateTime<Utc>>,
    /// Minutes left in the running break, rounded up
    pub break_minutes_remaining: Option<u32>,
    pub requested_break_minutes: u32,
    pub pending_break_minutes: u32,
    pub settings_locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn settings_defaults() {
        let settings = LimiterSettings::default();
        assert!(!settings.enabled);
        assert!(!settings.exit_to_title);
        assert_eq!(settings.day_limit, 3);
        assert!(settings.break_until.is_none());
    }

    #[test]
    fn settings_missing_fields_use_defaults() {
        let settings: LimiterSettings = serde_json::from_str(r#"{"enabled": true}"#).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.day_limit, DEFAULT_DAY_LIMIT);
    }

    #[test]
    fn patch_only_touches_owned_fields() {
        let until = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let stored = LimiterSettings {
            enabled: true,
            exit_to_title: true,
            day_limit: 7,
            break_until: None,
        };

        let merged = stored.merged(&SettingsPatch::break_until(Some(until)));
        assert!(merged.enabled);
        assert!(merged.exit_to_title);
        assert_eq!(merged.day_limit, 7);
        assert_eq!(merged.break_until, Some(until));

        let cleared = merged.merged(&SettingsPatch::break_until(None));
        assert!(cleared.break_until.is_none());
        assert_eq!(cleared.day_limit, 7);
    }

    #[test]
    fn user_fields_patch_leaves_enabled_and_break_deadline() {
        let until = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let stored = LimiterSettings {
            break_until: Some(until),
            ..Default::default()
        };
        let edited = LimiterSettings {
            enabled: true,
            day_limit: 5,
            ..Default::default()
        };

        let merged = stored.merged(&SettingsPatch::user_fields(&edited));
        assert!(!merged.enabled);
        assert_eq!(merged.day_limit, 5);
        assert_eq!(merged.break_until, Some(until));
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let absent: SettingsPatch = serde_json::from_str(r#"{"day_limit": 4}"#).unwrap();
        assert_eq!(absent.break_until, None);

        let cleared: SettingsPatch = serde_json::from_str(r#"{"break_until": null}"#).unwrap();
        assert_eq!(cleared.break_until, Some(None));

        let json = serde_json::to_string(&SettingsPatch::break_until(None)).unwrap();
        assert_eq!(json, r#"{"break_until":null}"#);
    }

    #[test]
    fn config_field_wire_format() {
        let json = serde_json::to_string(&ConfigField::DayLimit(5)).unwrap();
        assert_eq!(json, r#"{"field":"day_limit","value":5}"#);

        let parsed: ConfigField =
            serde_json::from_str(r#"{"field":"enabled","value":true}"#).unwrap();
        assert_eq!(parsed, ConfigField::Enabled(true));
    }
}
