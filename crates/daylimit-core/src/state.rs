//! Limiter state machine
//!
//! Pure logic: every transition takes the current wall-clock time where it
//! needs one and returns the effects the host (and the engine) must carry
//! out. Persisting, auditing and logging happen in [`crate::CoreEngine`].
//!
//! `settings.day_limit >= 1` is a precondition; edits are validated before
//! they reach the state.

use chrono::{DateTime, Utc};
use daylimit_api::{
    ConfigField, Effect, LimiterPhase, LimiterSettings, LimiterStatus, MessageKey, SettingsPatch,
};
use daylimit_config::{validate_break_minutes, validate_day_limit};

use crate::{break_deadline, break_minutes_remaining, check_break, BreakCheck, CoreError, CoreResult};

/// In-memory limiter state for one running session
#[derive(Debug, Clone)]
pub struct LimiterState {
    settings: LimiterSettings,
    day_count: u32,
    limit_reached: bool,
    break_mode_active: bool,
    /// Day count at which the final-day warning was shown
    final_day_warned_at: Option<u32>,
    requested_break_minutes: u32,
    pending_break_minutes: u32,
    prevent_changing: bool,
    session_loaded: bool,
}

impl LimiterState {
    /// Fresh state built from loaded settings
    pub fn new(settings: LimiterSettings) -> Self {
        Self {
            settings,
            day_count: 0,
            limit_reached: false,
            break_mode_active: false,
            final_day_warned_at: None,
            requested_break_minutes: 0,
            pending_break_minutes: 0,
            prevent_changing: false,
            session_loaded: false,
        }
    }

    pub fn settings(&self) -> &LimiterSettings {
        &self.settings
    }

    pub fn day_count(&self) -> u32 {
        self.day_count
    }

    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    pub fn break_mode_active(&self) -> bool {
        self.break_mode_active
    }

    pub fn requested_break_minutes(&self) -> u32 {
        self.requested_break_minutes
    }

    pub fn pending_break_minutes(&self) -> u32 {
        self.pending_break_minutes
    }

    pub fn settings_locked(&self) -> bool {
        self.prevent_changing
    }

    pub fn session_loaded(&self) -> bool {
        self.session_loaded
    }

    /// Current phase. Break mode overrides everything else.
    pub fn phase(&self) -> LimiterPhase {
        if self.break_mode_active {
            LimiterPhase::BreakMode
        } else if self.limit_reached {
            LimiterPhase::LimitReached
        } else if !self.settings.enabled {
            LimiterPhase::Idle
        } else if self.final_day_warned_at == Some(self.day_count) {
            LimiterPhase::FinalDayWarned
        } else {
            LimiterPhase::Counting
        }
    }

    /// A save was loaded.
    ///
    /// Settings edits made in memory carry into the session; only an
    /// unapplied break request is dropped.
    pub fn on_session_loaded(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        self.reset_count();
        self.limit_reached = false;
        self.requested_break_minutes = 0;
        self.session_loaded = true;

        self.reconcile_break(now).into_iter().collect()
    }

    /// A new day started: commit a pending break, or evaluate the limit
    pub fn on_day_started(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.pending_break_minutes > 0 {
            let until = break_deadline(now, self.pending_break_minutes);
            self.settings.break_until = Some(until);
            self.break_mode_active = true;
            self.pending_break_minutes = 0;
            self.requested_break_minutes = 0;

            effects.push(Effect::persist(SettingsPatch::break_until(Some(until))));
            effects.push(self.break_message(now));
            return effects;
        }

        effects.extend(self.reconcile_break(now));

        if self.break_mode_active {
            effects.push(self.break_message(now));
            return effects;
        }

        if !self.settings.enabled {
            return effects;
        }

        let day_limit = self.settings.day_limit;
        if self.day_count >= day_limit {
            self.limit_reached = true;
            effects.push(Effect::message(MessageKey::ShutDown, Vec::new()));
        } else if self.day_count + 1 == day_limit
            && self.final_day_warned_at != Some(self.day_count)
        {
            self.final_day_warned_at = Some(self.day_count);
            effects.push(Effect::message(
                MessageKey::FinalDay,
                vec![day_limit - self.day_count],
            ));
        }

        effects
    }

    /// The current day is ending
    pub fn on_day_ending(&mut self) -> Vec<Effect> {
        if self.settings.enabled {
            self.day_count = self.day_count.saturating_add(1);
        }
        Vec::new()
    }

    /// The host returned to title: discard everything and start over from
    /// freshly loaded settings
    pub fn on_returned_to_title(&mut self, settings: LimiterSettings) -> Vec<Effect> {
        *self = Self::new(settings);
        Vec::new()
    }

    /// Menus opened or closed. Exits are only requested once no menu is open.
    pub fn on_menu_visibility_changed(&self, any_menu_open: bool) -> Vec<Effect> {
        if any_menu_open || !self.session_loaded {
            return Vec::new();
        }

        match self.phase() {
            LimiterPhase::BreakMode => vec![Effect::RequestExitToTitle],
            LimiterPhase::LimitReached if self.settings.exit_to_title => {
                vec![Effect::RequestExitToTitle]
            }
            LimiterPhase::LimitReached => vec![Effect::RequestQuit],
            _ => Vec::new(),
        }
    }

    /// One setting edited in the settings UI
    pub fn on_config_field_changed(&mut self, field: ConfigField) -> CoreResult<Vec<Effect>> {
        if self.prevent_changing && !matches!(field, ConfigField::BreakMinutes(_)) {
            return Err(CoreError::SettingsLocked);
        }

        match field {
            ConfigField::Enabled(enabled) => self.set_enabled(enabled),
            ConfigField::ExitToTitle(exit_to_title) => self.settings.exit_to_title = exit_to_title,
            ConfigField::DayLimit(day_limit) => {
                self.settings.day_limit = validate_day_limit(day_limit)?;
            }
            ConfigField::BreakMinutes(minutes) => {
                if !self.session_loaded || self.break_mode_active {
                    return Err(CoreError::BreakUnavailable);
                }
                self.requested_break_minutes = validate_break_minutes(minutes)?;
            }
            ConfigField::PreventChanging(lock) => {
                self.prevent_changing = lock && self.settings.enabled;
            }
        }

        Ok(Vec::new())
    }

    /// The settings UI was saved: commit the break request and persist the
    /// fields the UI owns
    pub fn apply_settings(&mut self) -> Vec<Effect> {
        self.pending_break_minutes = self.requested_break_minutes;
        vec![Effect::persist(SettingsPatch::user_fields(&self.settings))]
    }

    /// "Reset to defaults" in the settings UI. Releases the edit lock; the
    /// break deadline is left alone.
    pub fn reset_settings(&mut self) -> Vec<Effect> {
        let defaults = LimiterSettings {
            break_until: self.settings.break_until,
            ..LimiterSettings::default()
        };
        self.set_enabled(defaults.enabled);
        self.settings = defaults;
        self.prevent_changing = false;
        self.requested_break_minutes = 0;
        Vec::new()
    }

    /// Message describing the running break, or that none is running
    pub fn break_message(&self, now: DateTime<Utc>) -> Effect {
        match break_minutes_remaining(self.settings.break_until, now) {
            Some(minutes) => Effect::message(MessageKey::OnBreak, vec![minutes]),
            None => Effect::message(MessageKey::BreakRemainingNone, Vec::new()),
        }
    }

    /// Status view for settings menus
    pub fn status(&self, now: DateTime<Utc>) -> LimiterStatus {
        let days_remaining = (self.session_loaded && self.settings.enabled)
            .then(|| self.settings.day_limit.saturating_sub(self.day_count));

        LimiterStatus {
            phase: self.phase(),
            session_loaded: self.session_loaded,
            enabled: self.settings.enabled,
            exit_to_title: self.settings.exit_to_title,
            day_count: self.day_count,
            day_limit: self.settings.day_limit,
            days_remaining,
            break_until: self.settings.break_until,
            break_minutes_remaining: break_minutes_remaining(self.settings.break_until, now),
            requested_break_minutes: self.requested_break_minutes,
            pending_break_minutes: self.pending_break_minutes,
            settings_locked: self.prevent_changing,
        }
    }

    // Switching the feature on or off always restarts the count.
    fn set_enabled(&mut self, enabled: bool) {
        if self.settings.enabled != enabled {
            self.reset_count();
        }
        self.settings.enabled = enabled;
    }

    fn reset_count(&mut self) {
        self.day_count = 0;
        self.final_day_warned_at = None;
    }

    fn reconcile_break(&mut self, now: DateTime<Utc>) -> Option<Effect> {
        match check_break(self.settings.break_until, now) {
            BreakCheck::Active { .. } => {
                self.break_mode_active = true;
                None
            }
            BreakCheck::Expired { .. } => {
                self.settings.break_until = None;
                self.break_mode_active = false;
                Some(Effect::persist(SettingsPatch::break_until(None)))
            }
            BreakCheck::NoBreak => {
                self.break_mode_active = false;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn enabled_state(day_limit: u32, exit_to_title: bool) -> LimiterState {
        let mut state = LimiterState::new(LimiterSettings {
            enabled: true,
            exit_to_title,
            day_limit,
            break_until: None,
        });
        assert!(state.on_session_loaded(noon()).is_empty());
        state
    }

    fn messages(effects: &[Effect]) -> Vec<MessageKey> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::ShowMessage { key, .. } => Some(*key),
                _ => None,
            })
            .collect()
    }

    fn persisted(effects: &[Effect]) -> Vec<SettingsPatch> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::PersistConfiguration { patch } => Some(patch.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_limit_reached_exactly_at_day_limit() {
        for day_limit in 1..=50 {
            let mut state = enabled_state(day_limit, false);
            let mut final_day_warnings = 0;
            let now = noon();

            for day in 0..=day_limit {
                let effects = state.on_day_started(now);
                let keys = messages(&effects);

                if keys.contains(&MessageKey::FinalDay) {
                    final_day_warnings += 1;
                    assert_eq!(state.day_count(), day_limit - 1);
                }

                if day < day_limit {
                    assert!(!state.limit_reached(), "limit {} day {}", day_limit, day);
                    assert!(!keys.contains(&MessageKey::ShutDown));
                    state.on_day_ending();
                } else {
                    assert_eq!(state.day_count(), day_limit);
                    assert!(state.limit_reached());
                    assert_eq!(keys, vec![MessageKey::ShutDown]);
                }
            }

            assert_eq!(final_day_warnings, 1, "limit {}", day_limit);
        }
    }

    #[test]
    fn test_day_limit_one_warns_on_first_day() {
        let mut state = enabled_state(1, false);

        let effects = state.on_day_started(noon());
        assert_eq!(effects, vec![Effect::message(MessageKey::FinalDay, vec![1])]);
        assert_eq!(state.phase(), LimiterPhase::FinalDayWarned);
    }

    #[test]
    fn test_final_day_not_repeated_for_same_count() {
        let mut state = enabled_state(2, false);
        state.on_day_ending();

        assert_eq!(messages(&state.on_day_started(noon())), vec![MessageKey::FinalDay]);
        assert!(state.on_day_started(noon()).is_empty());
    }

    #[test]
    fn test_three_day_scenario_quits() {
        let mut state = enabled_state(3, false);
        let now = noon();

        state.on_day_ending();
        state.on_day_ending();
        assert_eq!(state.day_count(), 2);

        let effects = state.on_day_started(now);
        assert_eq!(effects, vec![Effect::message(MessageKey::FinalDay, vec![1])]);

        state.on_day_ending();
        assert_eq!(state.day_count(), 3);

        let effects = state.on_day_started(now);
        assert_eq!(effects, vec![Effect::message(MessageKey::ShutDown, vec![])]);
        assert_eq!(state.phase(), LimiterPhase::LimitReached);

        // The shutdown dialogue is still open.
        assert!(state.on_menu_visibility_changed(true).is_empty());
        assert_eq!(
            state.on_menu_visibility_changed(false),
            vec![Effect::RequestQuit]
        );
    }

    #[test]
    fn test_limit_reached_exits_to_title_when_configured() {
        let mut state = enabled_state(1, true);
        state.on_day_ending();
        state.on_day_started(noon());

        assert_eq!(
            state.on_menu_visibility_changed(false),
            vec![Effect::RequestExitToTitle]
        );
    }

    #[test]
    fn test_no_exit_while_counting_or_idle() {
        let mut state = enabled_state(3, false);
        state.on_day_started(noon());
        assert!(state.on_menu_visibility_changed(false).is_empty());

        let mut idle = LimiterState::new(LimiterSettings::default());
        idle.on_session_loaded(noon());
        idle.on_day_started(noon());
        assert_eq!(idle.phase(), LimiterPhase::Idle);
        assert!(idle.on_menu_visibility_changed(false).is_empty());
    }

    #[test]
    fn test_no_exit_before_session_loaded() {
        let mut state = LimiterState::new(LimiterSettings {
            break_until: Some(noon() + Duration::minutes(30)),
            ..Default::default()
        });
        assert!(state.on_menu_visibility_changed(false).is_empty());

        state.on_session_loaded(noon());
        assert_eq!(
            state.on_menu_visibility_changed(false),
            vec![Effect::RequestExitToTitle]
        );
    }

    #[test]
    fn test_disabled_does_not_count() {
        let mut state = LimiterState::new(LimiterSettings::default());
        state.on_session_loaded(noon());
        state.on_day_ending();
        state.on_day_ending();
        assert_eq!(state.day_count(), 0);
        assert!(state.on_day_started(noon()).is_empty());
    }

    #[test]
    fn test_toggling_enabled_resets_count() {
        let mut state = enabled_state(10, false);
        for _ in 0..4 {
            state.on_day_ending();
        }
        assert_eq!(state.day_count(), 4);

        state
            .on_config_field_changed(ConfigField::Enabled(false))
            .unwrap();
        assert_eq!(state.day_count(), 0);
        assert_eq!(state.phase(), LimiterPhase::Idle);

        state
            .on_config_field_changed(ConfigField::Enabled(true))
            .unwrap();
        state.on_day_ending();
        state.on_day_ending();
        assert_eq!(state.day_count(), 2);

        state
            .on_config_field_changed(ConfigField::Enabled(false))
            .unwrap();
        assert_eq!(state.day_count(), 0);
    }

    #[test]
    fn test_setting_same_enabled_value_keeps_count() {
        let mut state = enabled_state(10, false);
        state.on_day_ending();
        state
            .on_config_field_changed(ConfigField::Enabled(true))
            .unwrap();
        assert_eq!(state.day_count(), 1);
    }

    #[test]
    fn test_invalid_day_limit_rejected() {
        let mut state = enabled_state(3, false);
        let result = state.on_config_field_changed(ConfigField::DayLimit(0));
        assert!(matches!(result, Err(CoreError::InvalidValue(_))));
        assert_eq!(state.settings().day_limit, 3);
    }

    #[test]
    fn test_break_request_committed_on_apply_and_started_at_day_start() {
        let mut state = enabled_state(3, false);
        let now = noon();

        state
            .on_config_field_changed(ConfigField::BreakMinutes(10))
            .unwrap();
        assert_eq!(state.requested_break_minutes(), 10);
        assert_eq!(state.pending_break_minutes(), 0);

        // Not applied yet: the day starts normally.
        assert!(state.on_day_started(now).is_empty());
        assert!(!state.break_mode_active());

        let effects = state.apply_settings();
        assert_eq!(persisted(&effects).len(), 1);
        assert_eq!(state.pending_break_minutes(), 10);

        let effects = state.on_day_started(now);
        let until = now + Duration::minutes(10);
        assert_eq!(
            effects,
            vec![
                Effect::persist(SettingsPatch::break_until(Some(until))),
                Effect::message(MessageKey::OnBreak, vec![10]),
            ]
        );
        assert_eq!(state.phase(), LimiterPhase::BreakMode);
        assert_eq!(state.pending_break_minutes(), 0);
        assert_eq!(state.status(now).break_minutes_remaining, Some(10));

        assert_eq!(
            state.on_menu_visibility_changed(false),
            vec![Effect::RequestExitToTitle]
        );
    }

    #[test]
    fn test_expired_break_cleared_once_and_limiting_resumes() {
        let mut state = enabled_state(3, false);
        let start = noon();

        state.on_day_ending();
        state
            .on_config_field_changed(ConfigField::BreakMinutes(10))
            .unwrap();
        state.apply_settings();
        state.on_day_started(start);
        assert!(state.break_mode_active());

        // While the break runs, limiting is suppressed.
        state.on_day_ending();
        let effects = state.on_day_started(start + Duration::minutes(5));
        assert_eq!(messages(&effects), vec![MessageKey::OnBreak]);
        assert!(persisted(&effects).is_empty());

        let later = start + Duration::minutes(11);
        let effects = state.on_day_started(later);
        assert_eq!(
            effects,
            vec![
                Effect::persist(SettingsPatch::break_until(None)),
                Effect::message(MessageKey::FinalDay, vec![1]),
            ]
        );
        assert!(!state.break_mode_active());
        assert!(state.settings().break_until.is_none());
        assert_eq!(state.day_count(), 2);

        // Cleared once: the next day start does not persist again.
        state.on_day_ending();
        let effects = state.on_day_started(later);
        assert!(persisted(&effects).is_empty());
        assert_eq!(messages(&effects), vec![MessageKey::ShutDown]);
    }

    #[test]
    fn test_session_load_drops_unapplied_break_request() {
        let mut state = enabled_state(3, false);
        state
            .on_config_field_changed(ConfigField::BreakMinutes(20))
            .unwrap();
        state
            .on_config_field_changed(ConfigField::DayLimit(5))
            .unwrap();

        state.on_session_loaded(noon());
        assert_eq!(state.requested_break_minutes(), 0);
        assert_eq!(state.settings().day_limit, 5);

        state.apply_settings();
        assert!(state.on_day_started(noon()).is_empty());
        assert!(!state.break_mode_active());
    }

    #[test]
    fn test_zero_break_minutes_never_start_break() {
        let mut state = enabled_state(3, false);
        state
            .on_config_field_changed(ConfigField::BreakMinutes(0))
            .unwrap();
        state.apply_settings();

        let effects = state.on_day_started(noon());
        assert!(effects.is_empty());
        assert!(!state.break_mode_active());
    }

    #[test]
    fn test_session_load_with_future_break_enters_break_mode() {
        let now = noon();
        let until = now + Duration::minutes(30);
        let mut state = LimiterState::new(LimiterSettings {
            enabled: true,
            day_limit: 1,
            break_until: Some(until),
            ..Default::default()
        });

        assert!(state.on_session_loaded(now).is_empty());
        assert_eq!(state.phase(), LimiterPhase::BreakMode);

        // Final-day evaluation is suppressed.
        let effects = state.on_day_started(now);
        assert_eq!(effects, vec![Effect::message(MessageKey::OnBreak, vec![30])]);
    }

    #[test]
    fn test_session_load_with_expired_break_clears_it() {
        let now = noon();
        let mut state = LimiterState::new(LimiterSettings {
            break_until: Some(now - Duration::minutes(1)),
            ..Default::default()
        });

        let effects = state.on_session_loaded(now);
        assert_eq!(effects, vec![Effect::persist(SettingsPatch::break_until(None))]);
        assert_eq!(state.phase(), LimiterPhase::Idle);
        assert!(state.on_day_started(now).is_empty());
    }

    #[test]
    fn test_break_unavailable_outside_session_or_during_break() {
        let mut state = LimiterState::new(LimiterSettings::default());
        assert!(matches!(
            state.on_config_field_changed(ConfigField::BreakMinutes(5)),
            Err(CoreError::BreakUnavailable)
        ));

        let mut on_break = LimiterState::new(LimiterSettings {
            break_until: Some(noon() + Duration::minutes(5)),
            ..Default::default()
        });
        on_break.on_session_loaded(noon());
        assert!(matches!(
            on_break.on_config_field_changed(ConfigField::BreakMinutes(5)),
            Err(CoreError::BreakUnavailable)
        ));
    }

    #[test]
    fn test_break_minutes_out_of_range_rejected() {
        let mut state = enabled_state(3, false);
        assert!(matches!(
            state.on_config_field_changed(ConfigField::BreakMinutes(481)),
            Err(CoreError::InvalidValue(_))
        ));
        assert_eq!(state.requested_break_minutes(), 0);
    }

    #[test]
    fn test_lock_rejects_edits_until_reset() {
        let mut state = enabled_state(3, false);
        state
            .on_config_field_changed(ConfigField::PreventChanging(true))
            .unwrap();
        assert!(state.settings_locked());

        assert!(matches!(
            state.on_config_field_changed(ConfigField::Enabled(false)),
            Err(CoreError::SettingsLocked)
        ));
        assert!(matches!(
            state.on_config_field_changed(ConfigField::DayLimit(10)),
            Err(CoreError::SettingsLocked)
        ));
        assert!(matches!(
            state.on_config_field_changed(ConfigField::PreventChanging(false)),
            Err(CoreError::SettingsLocked)
        ));
        assert!(state.settings().enabled);

        // Breaks can still be requested.
        state
            .on_config_field_changed(ConfigField::BreakMinutes(15))
            .unwrap();

        state.reset_settings();
        assert!(!state.settings_locked());
        state
            .on_config_field_changed(ConfigField::DayLimit(10))
            .unwrap();
    }

    #[test]
    fn test_lock_requires_enabled() {
        let mut state = LimiterState::new(LimiterSettings::default());
        state
            .on_config_field_changed(ConfigField::PreventChanging(true))
            .unwrap();
        assert!(!state.settings_locked());
    }

    #[test]
    fn test_reset_restores_defaults_but_keeps_break_deadline() {
        let until = noon() + Duration::minutes(20);
        let mut state = LimiterState::new(LimiterSettings {
            enabled: true,
            exit_to_title: true,
            day_limit: 9,
            break_until: Some(until),
        });
        state.on_session_loaded(noon());

        state.reset_settings();
        let settings = state.settings();
        assert!(!settings.enabled);
        assert!(!settings.exit_to_title);
        assert_eq!(settings.day_limit, 3);
        assert_eq!(settings.break_until, Some(until));
    }

    #[test]
    fn test_returned_to_title_rebuilds_state() {
        let mut state = enabled_state(3, false);
        state.on_day_ending();
        state
            .on_config_field_changed(ConfigField::DayLimit(7))
            .unwrap();

        state.on_returned_to_title(LimiterSettings {
            enabled: true,
            ..Default::default()
        });
        assert_eq!(state.day_count(), 0);
        assert_eq!(state.settings().day_limit, 3);
        assert!(!state.session_loaded());
    }

    #[test]
    fn test_status_days_remaining() {
        let mut state = enabled_state(5, false);
        state.on_day_ending();
        state.on_day_ending();

        let status = state.status(noon());
        assert_eq!(status.day_count, 2);
        assert_eq!(status.days_remaining, Some(3));
        assert_eq!(status.phase, LimiterPhase::Counting);

        let idle = LimiterState::new(LimiterSettings::default());
        assert_eq!(idle.status(noon()).days_remaining, None);
    }

    #[test]
    fn test_break_message_without_break() {
        let state = enabled_state(3, false);
        assert_eq!(
            state.break_message(noon()),
            Effect::message(MessageKey::BreakRemainingNone, vec![])
        );
    }
}
