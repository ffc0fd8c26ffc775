//! Events flowing between the host application and the limiter

use serde::{Deserialize, Serialize};

use crate::{ConfigField, MessageKey, SettingsPatch};

/// Lifecycle events pushed by the host, delivered one at a time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A save was loaded and play is about to begin
    SessionLoaded,

    /// A new in-app day started
    DayStarted,

    /// The current in-app day is ending
    DayEnding,

    /// The host went back to its title screen
    ReturnedToTitle,

    /// A menu opened or closed
    MenuVisibilityChanged { any_menu_open: bool },

    /// The user edited one setting in the settings UI
    ConfigFieldChanged { field: ConfigField },

    /// The user saved the settings UI
    SettingsApplied,

    /// The user pressed "reset to defaults" in the settings UI
    SettingsReset,
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::SessionLoaded => "session_loaded",
            HostEvent::DayStarted => "day_started",
            HostEvent::DayEnding => "day_ending",
            HostEvent::ReturnedToTitle => "returned_to_title",
            HostEvent::MenuVisibilityChanged { .. } => "menu_visibility_changed",
            HostEvent::ConfigFieldChanged { .. } => "config_field_changed",
            HostEvent::SettingsApplied => "settings_applied",
            HostEvent::SettingsReset => "settings_reset",
        }
    }
}

/// Effects produced by the limiter for the host to carry out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Show a translated message with ordered substitution values
    ShowMessage { key: MessageKey, params: Vec<u32> },

    /// Leave the session and return to the title screen
    RequestExitToTitle,

    /// Quit the application
    RequestQuit,

    /// Settings must be stored, merged against the stored snapshot
    PersistConfiguration { patch: SettingsPatch },
}

impl Effect {
    pub fn message(key: MessageKey, params: Vec<u32>) -> Self {
        Effect::ShowMessage { key, params }
    }

    pub fn persist(patch: SettingsPatch) -> Self {
        Effect::PersistConfiguration { patch }
    }

    /// Whether this effect ends the running session
    pub fn is_exit(&self) -> bool {
        matches!(self, Effect::RequestExitToTitle | Effect::RequestQuit)
    }
}
