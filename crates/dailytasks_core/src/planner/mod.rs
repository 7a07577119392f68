//! Pure day-planning logic over task snapshots.
//!
//! # Responsibility
//! - Overlap validation for create/edit flows.
//! - Display projections (ordering, progress, timeline geometry).
//!
//! # Invariants
//! - Nothing in this module touches storage or the reminder host.

pub mod day_view;
pub mod overlap;
