//! Repository layer: the durable task store.
//!
//! # Responsibility
//! - Define the store contract consumed by services and the rearm handler.
//! - Isolate SQLite query details from orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Task::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod task_repo;
