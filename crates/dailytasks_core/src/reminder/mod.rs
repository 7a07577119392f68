//! Local one-shot reminders for tasks.
//!
//! # Responsibility
//! - Compute trigger instants and register them with a host alarm facility.
//! - Handle fired reminders against fresh store data.
//! - Re-arm every reminder after a host restart.
//!
//! # Invariants
//! - One live registration per task ID; the task ID is the only key.
//! - Scheduler and delivery hold no persistent task references.

pub mod clock;
pub mod delivery;
pub mod host;
pub mod rearm;
pub mod scheduler;
