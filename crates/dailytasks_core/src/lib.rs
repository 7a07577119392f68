//! Core domain logic for the DailyTasks planner.
//! This crate is the single source of truth for scheduling invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod planner;
pub mod reminder;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::task::{Category, Priority, Subtask, SubtaskId, Task, TaskId, TaskValidationError};
pub use model::time_of_day::{TimeFormatError, TimeOfDay};
pub use planner::overlap::{find_conflict, intervals_overlap};
pub use reminder::clock::{Clock, FixedClock, SystemClock};
pub use reminder::delivery::{DeliveryOutcome, Notifier, ReminderDelivery};
pub use reminder::host::{AlarmHost, HostError, InMemoryAlarmHost, ReminderPayload};
pub use reminder::scheduler::{PastTriggerPolicy, ReminderScheduler, ScheduleError};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use service::task_service::{
    ServiceError, SubmitOutcome, TaskForm, TaskService, ValidationError,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
