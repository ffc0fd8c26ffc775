//! Validated service configuration

use crate::schema::{RawConfig, RawDefaults, RawServiceConfig};
use daylimit_api::LimiterSettings;
use std::path::PathBuf;

/// Default log filter when neither the config nor RUST_LOG sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Validated configuration ready for use by the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the settings database
    pub data_dir: PathBuf,

    /// Log filter
    pub log_level: String,

    /// Settings written to the store when nothing has been saved yet
    pub initial_settings: Option<LimiterSettings>,
}

impl ServiceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let RawServiceConfig { data_dir, log_level } = raw.service;

        Self {
            data_dir: data_dir.unwrap_or_else(daylimit_util::default_data_dir),
            log_level: log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            initial_settings: raw.defaults.map(convert_defaults),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: daylimit_util::default_data_dir(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            initial_settings: None,
        }
    }
}

fn convert_defaults(raw: RawDefaults) -> LimiterSettings {
    let base = LimiterSettings::default();
    LimiterSettings {
        enabled: raw.enabled.unwrap_or(base.enabled),
        exit_to_title: raw.exit_to_title.unwrap_or(base.exit_to_title),
        day_limit: raw.day_limit.unwrap_or(base.day_limit),
        break_until: None,
    }
}
