//! Configuration validation
//!
//! Every value that reaches the limiter passes through here first: the day
//! limit must be at least one, and break requests stay within the range the
//! settings menu offers.

use daylimit_api::{LimiterSettings, MAX_BREAK_MINUTES, MAX_DAY_LIMIT, MIN_DAY_LIMIT};
use thiserror::Error;

use crate::schema::RawConfig;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid day limit {value}: must be between 1 and 50")]
    InvalidLimitValue { value: u32 },

    #[error("Invalid break length {value} minutes: must be at most 480")]
    InvalidBreakMinutes { value: u32 },

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(level) = &config.service.log_level
        && !is_known_log_level(level)
    {
        errors.push(ValidationError::InvalidLogLevel(level.clone()));
    }

    if let Some(day_limit) = config.defaults.as_ref().and_then(|d| d.day_limit)
        && let Err(e) = validate_day_limit(day_limit)
    {
        errors.push(e);
    }

    if let Some(data_dir) = &config.service.data_dir
        && data_dir.as_os_str().is_empty()
    {
        errors.push(ValidationError::GlobalError(
            "service.data_dir cannot be empty".into(),
        ));
    }

    errors
}

/// Validate a stored settings snapshot
pub fn validate_settings(settings: &LimiterSettings) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if let Err(e) = validate_day_limit(settings.day_limit) {
        errors.push(e);
    }
    errors
}

/// Check a day limit edit
pub fn validate_day_limit(value: u32) -> Result<u32, ValidationError> {
    if (MIN_DAY_LIMIT..=MAX_DAY_LIMIT).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::InvalidLimitValue { value })
    }
}

/// Check a requested break length
pub fn validate_break_minutes(value: u32) -> Result<u32, ValidationError> {
    if value <= MAX_BREAK_MINUTES {
        Ok(value)
    } else {
        Err(ValidationError::InvalidBreakMinutes { value })
    }
}

fn is_known_log_level(level: &str) -> bool {
    matches!(
        level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    )
}
