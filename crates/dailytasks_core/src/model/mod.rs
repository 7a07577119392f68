//! Domain model for the daily task planner.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep clock-time handling in one value type shared by every module.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - A task's interval is half-open: `[start, end)`.

pub mod task;
pub mod time_of_day;
