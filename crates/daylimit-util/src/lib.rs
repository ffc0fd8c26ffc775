//! Shared utilities for daylimit
//!
//! This crate provides:
//! - ID types (SessionId)
//! - Wall-clock time helpers (UTC `now()` with mock-time support, minute rounding)
//! - Default paths for the config file and data directory

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
