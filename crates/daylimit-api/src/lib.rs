//! Protocol types for daylimit
//!
//! This crate defines the stable surface between the limiter and its host:
//! - Host events (inputs) and effects (outputs)
//! - Persisted settings and partial updates
//! - Line-protocol requests and responses
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
