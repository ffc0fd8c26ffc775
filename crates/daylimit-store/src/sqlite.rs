//! SQLite-based store implementation

use chrono::{DateTime, Utc};
use daylimit_api::{LimiterSettings, SettingsPatch};
use daylimit_config::validate_settings;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Settings snapshot (single row)
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                settings_json TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn read_settings(conn: &Connection) -> StoreResult<Option<LimiterSettings>> {
    let json: Option<String> = conn
        .query_row("SELECT settings_json FROM settings WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    match json {
        Some(s) => {
            let settings: LimiterSettings = serde_json::from_str(&s)?;
            check_settings(&settings)?;
            Ok(Some(settings))
        }
        None => Ok(None),
    }
}

fn write_settings(conn: &Connection, settings: &LimiterSettings) -> StoreResult<()> {
    let json = serde_json::to_string(settings)?;

    conn.execute(
        r#"
        INSERT INTO settings (id, settings_json)
        VALUES (1, ?)
        ON CONFLICT(id)
        DO UPDATE SET settings_json = excluded.settings_json
        "#,
        [json],
    )?;

    Ok(())
}

fn check_settings(settings: &LimiterSettings) -> StoreResult<()> {
    let errors = validate_settings(settings);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::InvalidSettings { errors })
    }
}

impl Store for SqliteStore {
    fn load_settings(&self) -> StoreResult<LimiterSettings> {
        let conn = self.lock()?;
        Ok(read_settings(&conn)?.unwrap_or_default())
    }

    fn save_settings(&self, patch: &SettingsPatch) -> StoreResult<LimiterSettings> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let stored = read_settings(&tx)?.unwrap_or_default();
        let merged = stored.merged(patch);
        check_settings(&merged)?;

        write_settings(&tx, &merged)?;
        tx.commit()?;

        debug!(
            enabled = merged.enabled,
            exit_to_title = merged.exit_to_title,
            day_limit = merged.day_limit,
            break_until = ?merged.break_until,
            "Settings saved"
        );
        Ok(merged)
    }

    fn seed_settings(&self, settings: &LimiterSettings) -> StoreResult<bool> {
        check_settings(settings)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if read_settings(&tx)?.is_some() {
            return Ok(false);
        }

        write_settings(&tx, settings)?;
        tx.commit()?;

        debug!("Settings seeded from service config");
        Ok(true)
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.lock()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| daylimit_util::now());
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
