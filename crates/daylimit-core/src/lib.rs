//! Day-limit policy engine for daylimit
//!
//! This crate is the heart of daylimit, containing:
//! - The limiter state machine (Idle -> Counting -> FinalDayWarned -> LimitReached, with BreakMode overriding)
//! - Break deadline reconciliation against wall-clock time
//! - The engine that persists settings writes and records audit events

mod break_timer;
mod engine;
mod error;
mod state;

pub use break_timer::*;
pub use engine::*;
pub use error::*;
pub use state::*;
