//! Re-arming reminders after a host restart.
//!
//! Host alarms do not survive a device or browser restart. On the host's
//! startup signal every stored task is scheduled again, unconditionally;
//! there is no "already fired today" bookkeeping, so tasks whose start time
//! has passed follow the scheduler's `PastTriggerPolicy`.

use crate::model::task::TaskId;
use crate::repo::task_repo::{RepoResult, TaskRepository};
use chrono::{DateTime, Local};
use log::{info, warn};
use std::time::Instant;

use super::clock::Clock;
use super::host::AlarmHost;
use super::scheduler::{ReminderScheduler, ScheduleError};

/// Per-task outcome of a rearm pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RearmReport {
    pub scheduled: Vec<(TaskId, DateTime<Local>)>,
    pub failed: Vec<(TaskId, ScheduleError)>,
}

impl RearmReport {
    pub fn total(&self) -> usize {
        self.scheduled.len() + self.failed.len()
    }
}

/// Reads every task from `repo` and schedules each one.
///
/// A failing task does not stop the pass; its error is recorded in the report.
///
/// # Errors
/// - Returns the repository error when the task list cannot be read.
pub fn rearm_all<R, H, C>(repo: &R, scheduler: &ReminderScheduler<H, C>) -> RepoResult<RearmReport>
where
    R: TaskRepository + ?Sized,
    H: AlarmHost,
    C: Clock,
{
    let started_at = Instant::now();
    let tasks = repo.list_tasks()?;
    let mut report = RearmReport::default();

    for task in &tasks {
        match scheduler.schedule(task) {
            Ok(trigger_at) => report.scheduled.push((task.id, trigger_at)),
            Err(err) => {
                warn!(
                    "event=reminder_rearm_item module=reminder status=error task_id={} error={err}",
                    task.id
                );
                report.failed.push((task.id, err));
            }
        }
    }

    info!(
        "event=reminder_rearm module=reminder status=ok tasks={} scheduled={} failed={} duration_ms={}",
        tasks.len(),
        report.scheduled.len(),
        report.failed.len(),
        started_at.elapsed().as_millis()
    );
    Ok(report)
}
