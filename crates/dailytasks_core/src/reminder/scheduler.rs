//! Reminder scheduling: task start time to one-shot host alarm.
//!
//! # Responsibility
//! - Compute the trigger instant for a task's start time in local time.
//! - Register, replace and cancel host alarms keyed by task ID.
//!
//! # Invariants
//! - The trigger uses the clock's current local date at the moment of
//!   scheduling, combined with `task.start`.
//! - A trigger equal to "now" is not in the past.
//! - Past triggers are resolved by exactly one configured
//!   [`PastTriggerPolicy`]; the default is [`PastTriggerPolicy::NextDay`].
//! - Host failures are returned as-is and never retried here; the task is
//!   left without an active reminder.

use crate::model::task::{Task, TaskId};
use crate::model::time_of_day::TimeOfDay;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, TimeZone};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

use super::clock::Clock;
use super::host::{AlarmHost, HostError, ReminderPayload};

/// Longest DST gap skipped over when a local start time does not exist.
pub const MAX_DST_GAP_MINUTES: i64 = 180;

/// How to handle a start time that has already passed today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PastTriggerPolicy {
    /// Fire as soon as possible (trigger = now).
    FireImmediately,
    /// Fire at the same time on the next calendar day.
    #[default]
    NextDay,
    /// Register nothing and report `ScheduleError::PastTrigger`.
    Decline,
}

impl PastTriggerPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FireImmediately => "fire_immediately",
            Self::NextDay => "next_day",
            Self::Decline => "decline",
        }
    }

    /// Parses `fire_immediately|next_day|decline` (case-insensitive, `-` allowed).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fire_immediately" | "immediate" => Some(Self::FireImmediately),
            "next_day" => Some(Self::NextDay),
            "decline" => Some(Self::Decline),
            _ => None,
        }
    }
}

impl Display for PastTriggerPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reminder registration failure. The task itself stays persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Start time already passed and the policy is `Decline`.
    PastTrigger {
        task_id: TaskId,
        trigger_at: DateTime<Local>,
    },
    /// The start time cannot be mapped to a local instant.
    InvalidLocalTime { task_id: TaskId, date: NaiveDate },
    /// The host alarm facility refused the registration.
    Host(HostError),
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PastTrigger {
                task_id,
                trigger_at,
            } => write!(
                f,
                "reminder for task {task_id} not scheduled: trigger {} is in the past",
                trigger_at.format("%Y-%m-%d %H:%M")
            ),
            Self::InvalidLocalTime { task_id, date } => write!(
                f,
                "reminder for task {task_id} not scheduled: start time does not exist on {date}"
            ),
            Self::Host(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for ScheduleError {
    fn from(value: HostError) -> Self {
        Self::Host(value)
    }
}

/// Maps `date` + `time` to an instant in the system local zone.
pub fn local_instant(date: NaiveDate, time: TimeOfDay) -> Option<DateTime<Local>> {
    instant_in_zone(&Local, date, time)
}

/// Maps `date` + `time` to an instant in `zone`.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times in a
/// DST gap resolve to the first valid minute after the gap. Gaps longer than
/// [`MAX_DST_GAP_MINUTES`] yield `None`.
pub fn instant_in_zone<Tz: TimeZone>(
    zone: &Tz,
    date: NaiveDate,
    time: TimeOfDay,
) -> Option<DateTime<Tz>> {
    let naive = date.and_time(time.to_naive_time());
    (0..=MAX_DST_GAP_MINUTES).find_map(|offset| {
        match zone.from_local_datetime(&(naive + Duration::minutes(offset))) {
            LocalResult::Single(instant) => Some(instant),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => None,
        }
    })
}

/// Computes the trigger for `start` relative to `now` under `policy`.
pub fn compute_trigger(
    task_id: TaskId,
    start: TimeOfDay,
    now: DateTime<Local>,
    policy: PastTriggerPolicy,
) -> Result<DateTime<Local>, ScheduleError> {
    let today = now.date_naive();
    let today_trigger = local_instant(today, start).ok_or(ScheduleError::InvalidLocalTime {
        task_id,
        date: today,
    })?;

    if today_trigger >= now {
        return Ok(today_trigger);
    }

    match policy {
        PastTriggerPolicy::FireImmediately => Ok(now),
        PastTriggerPolicy::NextDay => {
            let tomorrow = today
                .succ_opt()
                .ok_or(ScheduleError::InvalidLocalTime {
                    task_id,
                    date: today,
                })?;
            local_instant(tomorrow, start).ok_or(ScheduleError::InvalidLocalTime {
                task_id,
                date: tomorrow,
            })
        }
        PastTriggerPolicy::Decline => Err(ScheduleError::PastTrigger {
            task_id,
            trigger_at: today_trigger,
        }),
    }
}

/// Registers one-shot reminders for tasks with a host alarm facility.
pub struct ReminderScheduler<H, C> {
    host: H,
    clock: C,
    policy: PastTriggerPolicy,
}

impl<H: AlarmHost, C: Clock> ReminderScheduler<H, C> {
    /// Creates a scheduler with the default `NextDay` policy.
    pub fn new(host: H, clock: C) -> Self {
        Self::with_policy(host, clock, PastTriggerPolicy::default())
    }

    pub fn with_policy(host: H, clock: C, policy: PastTriggerPolicy) -> Self {
        Self {
            host,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> PastTriggerPolicy {
        self.policy
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Computes where `task`'s reminder would land right now, without registering.
    pub fn trigger_for(&self, task: &Task) -> Result<DateTime<Local>, ScheduleError> {
        compute_trigger(task.id, task.start, self.clock.now(), self.policy)
    }

    /// Registers (or replaces) the reminder for `task`.
    ///
    /// On any error the earlier registration for the same ID is cancelled,
    /// so a stale trigger cannot fire.
    ///
    /// # Errors
    /// - `PastTrigger` only under `PastTriggerPolicy::Decline`.
    /// - `Host` when the facility rejects the registration.
    pub fn schedule(&self, task: &Task) -> Result<DateTime<Local>, ScheduleError> {
        let trigger_at = match self.trigger_for(task) {
            Ok(trigger_at) => trigger_at,
            Err(err) => {
                self.host.cancel(task.id);
                info!(
                    "event=reminder_schedule module=reminder status=skipped task_id={} policy={} reason={err}",
                    task.id, self.policy
                );
                return Err(err);
            }
        };

        let payload = ReminderPayload::for_task(task);
        if let Err(err) = self.host.register(task.id, trigger_at, payload) {
            self.host.cancel(task.id);
            warn!(
                "event=reminder_schedule module=reminder status=error task_id={} error={err}",
                task.id
            );
            return Err(err.into());
        }

        info!(
            "event=reminder_schedule module=reminder status=ok task_id={} trigger_at={} policy={}",
            task.id,
            trigger_at.to_rfc3339(),
            self.policy
        );
        Ok(trigger_at)
    }

    /// Cancels any pending reminder for `task_id`; unknown IDs are a no-op.
    pub fn cancel(&self, task_id: TaskId) {
        self.host.cancel(task_id);
        info!("event=reminder_cancel module=reminder status=ok task_id={task_id}");
    }
}
