//! Error types for the limiter core

use daylimit_config::ValidationError;
use daylimit_store::StoreError;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Failed to load settings: {0}")]
    ConfigurationLoad(#[source] StoreError),

    #[error("Failed to persist settings: {0}")]
    Persist(#[source] StoreError),

    #[error("Invalid value: {0}")]
    InvalidValue(#[from] ValidationError),

    #[error("Settings are locked until reset")]
    SettingsLocked,

    #[error("Breaks can only be requested in a loaded session that is not already on break")]
    BreakUnavailable,
}

pub type CoreResult<T> = Result<T, CoreError>;
