//! Audit event types

use chrono::{DateTime, Utc};
use daylimit_api::ExitMode;
use daylimit_util::SessionId;
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// A save was loaded
    SessionLoaded {
        session_id: SessionId,
        enabled: bool,
        day_limit: u32,
        on_break: bool,
    },

    /// Host returned to title; the session's state was discarded
    SessionEnded { session_id: SessionId, day_count: u32 },

    /// Final-day warning shown
    FinalDayWarned {
        session_id: SessionId,
        day_count: u32,
        day_limit: u32,
    },

    /// Day limit reached
    LimitReached {
        session_id: SessionId,
        day_count: u32,
        day_limit: u32,
    },

    /// Break started from a committed request
    BreakStarted {
        session_id: SessionId,
        minutes: u32,
        until: DateTime<Utc>,
    },

    /// Expired break deadline cleared from storage
    BreakCleared { expired_at: DateTime<Utc> },

    /// Host asked to leave the session
    ExitRequested { session_id: SessionId, mode: ExitMode },

    /// Settings UI saved
    SettingsSaved {
        exit_to_title: bool,
        day_limit: u32,
    },

    /// Settings locked against further edits
    SettingsLocked { session_id: Option<SessionId> },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: daylimit_util::now(),
            event,
        }
    }
}
