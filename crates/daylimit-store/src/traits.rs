//! Store trait definitions

use daylimit_api::{LimiterSettings, SettingsPatch};

use crate::{AuditEvent, StoreResult};

/// Main store trait
///
/// Settings writes are partial: `save_settings` reads the currently stored
/// snapshot, overlays the fields set in the patch and writes the result, all
/// before returning. Callers never write back a full snapshot captured
/// earlier, so the settings UI and the break timer cannot lose each other's
/// updates.
pub trait Store: Send + Sync {
    // Settings

    /// Load the stored settings, or defaults if none were saved
    fn load_settings(&self) -> StoreResult<LimiterSettings>;

    /// Merge `patch` into the stored settings and return the merged snapshot
    fn save_settings(&self, patch: &SettingsPatch) -> StoreResult<LimiterSettings>;

    /// Store `settings` only if nothing is stored yet. Returns whether it was written.
    fn seed_settings(&self, settings: &LimiterSettings) -> StoreResult<bool>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
