//! Core policy engine

use chrono::{DateTime, Utc};
use daylimit_api::{
    ConfigField, Effect, ExitMode, HostEvent, LimiterSettings, LimiterStatus, MessageKey,
};
use daylimit_store::{AuditEvent, AuditEventType, Store};
use daylimit_util::SessionId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{CoreError, CoreResult, LimiterState};

/// The core policy engine
///
/// Owns the limiter state for the running session and the store it writes
/// through. Every `PersistConfiguration` effect is merged into storage before
/// `handle_event` returns; the effect stays in the returned list so the host
/// can mirror it.
pub struct CoreEngine {
    store: Arc<dyn Store>,
    state: LimiterState,
    session_id: Option<SessionId>,
}

impl CoreEngine {
    /// Create a new core engine from the stored settings
    pub fn new(store: Arc<dyn Store>) -> CoreResult<Self> {
        let settings = store.load_settings().map_err(CoreError::ConfigurationLoad)?;

        info!(
            enabled = settings.enabled,
            exit_to_title = settings.exit_to_title,
            day_limit = settings.day_limit,
            break_until = ?settings.break_until,
            "Core engine initialized"
        );

        Ok(Self {
            store,
            state: LimiterState::new(settings),
            session_id: None,
        })
    }

    /// Current limiter state
    pub fn state(&self) -> &LimiterState {
        &self.state
    }

    /// Current in-memory settings, including unsaved edits
    pub fn settings(&self) -> &LimiterSettings {
        self.state.settings()
    }

    /// ID of the loaded session, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Handle one host event to completion
    pub fn handle_event(
        &mut self,
        event: &HostEvent,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<Effect>> {
        debug!(event = event.name(), "Handling host event");

        let effects = match event {
            HostEvent::SessionLoaded => self.session_loaded(now),
            HostEvent::DayStarted => self.day_started(now),
            HostEvent::DayEnding => {
                let effects = self.state.on_day_ending();
                debug!(day_count = self.state.day_count(), "Day ended");
                effects
            }
            HostEvent::ReturnedToTitle => self.returned_to_title()?,
            HostEvent::MenuVisibilityChanged { any_menu_open } => {
                self.menu_visibility_changed(*any_menu_open)
            }
            HostEvent::ConfigFieldChanged { field } => self.config_field_changed(*field)?,
            HostEvent::SettingsApplied => self.state.apply_settings(),
            HostEvent::SettingsReset => {
                info!("Settings reset to defaults");
                self.state.reset_settings()
            }
        };

        self.persist(&effects)?;

        if matches!(event, HostEvent::SettingsApplied) {
            let settings = self.state.settings();
            self.audit(AuditEventType::SettingsSaved {
                exit_to_title: settings.exit_to_title,
                day_limit: settings.day_limit,
            });
            info!(
                enabled = settings.enabled,
                exit_to_title = settings.exit_to_title,
                day_limit = settings.day_limit,
                pending_break_minutes = self.state.pending_break_minutes(),
                "Settings applied"
            );
        }

        Ok(effects)
    }

    /// Status view for settings menus
    pub fn status(&self, now: DateTime<Utc>) -> LimiterStatus {
        self.state.status(now)
    }

    /// Message describing the running break, or that none is running
    pub fn break_remaining_message(&self, now: DateTime<Utc>) -> Effect {
        self.state.break_message(now)
    }

    fn session_loaded(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let previous_break = self.state.settings().break_until;
        let session_id = SessionId::new();

        let effects = self.state.on_session_loaded(now);
        self.record_break_changes(&effects, previous_break, now);

        let settings = self.state.settings();
        self.audit(AuditEventType::SessionLoaded {
            session_id: session_id.clone(),
            enabled: settings.enabled,
            day_limit: settings.day_limit,
            on_break: self.state.break_mode_active(),
        });
        info!(
            session_id = %session_id,
            enabled = settings.enabled,
            day_limit = settings.day_limit,
            on_break = self.state.break_mode_active(),
            "Session loaded"
        );

        self.session_id = Some(session_id);
        effects
    }

    fn day_started(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let previous_break = self.state.settings().break_until;
        let effects = self.state.on_day_started(now);
        self.record_break_changes(&effects, previous_break, now);

        let Some(session_id) = self.session_id.clone() else {
            return effects;
        };
        let day_count = self.state.day_count();
        let day_limit = self.state.settings().day_limit;

        for effect in &effects {
            let Effect::ShowMessage { key, .. } = effect else {
                continue;
            };
            match key {
                MessageKey::FinalDay => {
                    self.audit(AuditEventType::FinalDayWarned {
                        session_id: session_id.clone(),
                        day_count,
                        day_limit,
                    });
                    info!(session_id = %session_id, day_count, day_limit, "Final day");
                }
                MessageKey::ShutDown => {
                    self.audit(AuditEventType::LimitReached {
                        session_id: session_id.clone(),
                        day_count,
                        day_limit,
                    });
                    info!(session_id = %session_id, day_count, day_limit, "Day limit reached");
                }
                _ => {}
            }
        }

        effects
    }

    fn returned_to_title(&mut self) -> CoreResult<Vec<Effect>> {
        if let Some(session_id) = self.session_id.take() {
            let day_count = self.state.day_count();
            self.audit(AuditEventType::SessionEnded {
                session_id: session_id.clone(),
                day_count,
            });
            info!(session_id = %session_id, day_count, "Session ended");
        }

        let settings = self
            .store
            .load_settings()
            .map_err(CoreError::ConfigurationLoad)?;
        debug!(
            enabled = settings.enabled,
            day_limit = settings.day_limit,
            "Settings reloaded"
        );

        Ok(self.state.on_returned_to_title(settings))
    }

    fn menu_visibility_changed(&mut self, any_menu_open: bool) -> Vec<Effect> {
        let effects = self.state.on_menu_visibility_changed(any_menu_open);

        if let Some(session_id) = self.session_id.clone() {
            for effect in effects.iter().filter(|e| e.is_exit()) {
                let mode = match effect {
                    Effect::RequestQuit => ExitMode::Quit,
                    _ => ExitMode::ToTitle,
                };
                self.audit(AuditEventType::ExitRequested {
                    session_id: session_id.clone(),
                    mode,
                });
                info!(session_id = %session_id, mode = ?mode, "Exit requested");
            }
        }

        effects
    }

    fn config_field_changed(&mut self, field: ConfigField) -> CoreResult<Vec<Effect>> {
        let was_locked = self.state.settings_locked();

        let effects = match self.state.on_config_field_changed(field) {
            Ok(effects) => effects,
            Err(e) => {
                warn!(field = field.name(), error = %e, "Setting change rejected");
                return Err(e);
            }
        };

        debug!(field = field.name(), "Setting changed");

        if !was_locked && self.state.settings_locked() {
            self.audit(AuditEventType::SettingsLocked {
                session_id: self.session_id.clone(),
            });
            info!("Settings locked");
        }

        Ok(effects)
    }

    fn record_break_changes(
        &self,
        effects: &[Effect],
        previous_break: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        for effect in effects {
            let Effect::PersistConfiguration { patch } = effect else {
                continue;
            };
            match patch.break_until {
                Some(Some(until)) => {
                    if let Some(session_id) = &self.session_id {
                        let minutes = (until - now).num_minutes().max(0);
                        self.audit(AuditEventType::BreakStarted {
                            session_id: session_id.clone(),
                            minutes: u32::try_from(minutes).unwrap_or(u32::MAX),
                            until,
                        });
                    }
                    info!(until = %until, "Break started");
                }
                Some(None) => {
                    if let Some(expired_at) = previous_break {
                        self.audit(AuditEventType::BreakCleared { expired_at });
                    }
                    info!("Expired break cleared");
                }
                None => {}
            }
        }
    }

    fn persist(&self, effects: &[Effect]) -> CoreResult<()> {
        for effect in effects {
            if let Effect::PersistConfiguration { patch } = effect {
                if patch.is_empty() {
                    continue;
                }
                let merged = self.store.save_settings(patch).map_err(|e| {
                    warn!(error = %e, "Failed to persist settings");
                    CoreError::Persist(e)
                })?;
                debug!(break_until = ?merged.break_until, "Settings persisted");
            }
        }
        Ok(())
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to record audit event");
        }
    }
}
