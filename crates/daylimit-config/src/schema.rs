//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Settings seeded into an empty store
    #[serde(default)]
    pub defaults: Option<RawDefaults>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the settings store
    pub data_dir: Option<PathBuf>,

    /// Log level filter (overridden by RUST_LOG)
    pub log_level: Option<String>,
}

/// Initial limiter settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDefaults {
    pub enabled: Option<bool>,
    pub exit_to_title: Option<bool>,
    pub day_limit: Option<u32>,
}
