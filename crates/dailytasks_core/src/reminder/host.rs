//! Host alarm facility contract and in-process implementations.
//!
//! # Responsibility
//! - Abstract the platform one-shot alarm primitive behind `AlarmHost`.
//! - Provide a recording host (tests, CLI) and a tokio timer host.
//!
//! # Invariants
//! - The task ID is the registration key: registering an existing key
//!   replaces the previous registration, never duplicates it.
//! - Cancelling an unknown key is a no-op.
//! - Registrations do not survive process restart; see `reminder::rearm`.

use crate::model::task::{Task, TaskId};
use chrono::{DateTime, Local};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::clock::Clock;

/// Failure reported by the host alarm facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The user or OS has not granted notification/alarm permission.
    PermissionDenied(String),
    /// The facility rejected or could not accept the registration.
    Unavailable(String),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied(detail) => write!(f, "alarm permission denied: {detail}"),
            Self::Unavailable(detail) => write!(f, "alarm facility unavailable: {detail}"),
        }
    }
}

impl Error for HostError {}

/// What the user sees when a reminder fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub task_id: TaskId,
    pub title: String,
    /// 12-hour start label, e.g. `9:00 AM`.
    pub start_label: String,
    /// 12-hour end label, e.g. `10:30 AM`.
    pub end_label: String,
}

impl ReminderPayload {
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            title: task.title.clone(),
            start_label: task.start.format_12h(),
            end_label: task.end.format_12h(),
        }
    }

    /// Notification body text.
    pub fn body(&self) -> String {
        format!("From {} to {}", self.start_label, self.end_label)
    }
}

/// One live registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub key: TaskId,
    pub trigger_at: DateTime<Local>,
    pub payload: ReminderPayload,
}

/// Platform one-shot alarm primitive.
pub trait AlarmHost {
    /// Registers or replaces the alarm for `key`.
    fn register(
        &self,
        key: TaskId,
        trigger_at: DateTime<Local>,
        payload: ReminderPayload,
    ) -> Result<(), HostError>;

    /// Removes any pending alarm for `key`.
    fn cancel(&self, key: TaskId);
}

impl<H: AlarmHost + ?Sized> AlarmHost for &H {
    fn register(
        &self,
        key: TaskId,
        trigger_at: DateTime<Local>,
        payload: ReminderPayload,
    ) -> Result<(), HostError> {
        (**self).register(key, trigger_at, payload)
    }

    fn cancel(&self, key: TaskId) {
        (**self).cancel(key)
    }
}

/// Recording host that keeps registrations in memory.
///
/// Nothing fires on its own; callers poll with [`InMemoryAlarmHost::take_due`].
#[derive(Debug, Default)]
pub struct InMemoryAlarmHost {
    registrations: Mutex<HashMap<TaskId, Registration>>,
    reject_with: Option<HostError>,
}

impl InMemoryAlarmHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose every `register` call fails with `error`.
    pub fn rejecting(error: HostError) -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
            reject_with: Some(error),
        }
    }

    pub fn registration(&self, key: TaskId) -> Option<Registration> {
        self.lock().get(&key).cloned()
    }

    /// Live registrations ordered by trigger instant.
    pub fn registrations(&self) -> Vec<Registration> {
        let mut all = self.lock().values().cloned().collect::<Vec<_>>();
        all.sort_by(|a, b| a.trigger_at.cmp(&b.trigger_at).then(a.key.cmp(&b.key)));
        all
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes and returns every registration due at or before `now`.
    pub fn take_due(&self, now: DateTime<Local>) -> Vec<Registration> {
        let mut guard = self.lock();
        let due_keys = guard
            .values()
            .filter(|registration| registration.trigger_at <= now)
            .map(|registration| registration.key)
            .collect::<Vec<_>>();
        let mut due = due_keys
            .into_iter()
            .filter_map(|key| guard.remove(&key))
            .collect::<Vec<_>>();
        due.sort_by(|a, b| a.trigger_at.cmp(&b.trigger_at));
        due
    }

    /// Drops every registration, as a host restart would.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl AlarmHost for InMemoryAlarmHost {
    fn register(
        &self,
        key: TaskId,
        trigger_at: DateTime<Local>,
        payload: ReminderPayload,
    ) -> Result<(), HostError> {
        if let Some(error) = &self.reject_with {
            return Err(error.clone());
        }
        self.lock().insert(
            key,
            Registration {
                key,
                trigger_at,
                payload,
            },
        );
        Ok(())
    }

    fn cancel(&self, key: TaskId) {
        self.lock().remove(&key);
    }
}

/// In-process host backed by tokio timers.
///
/// Fired payloads are sent to the receiver returned by [`TimerAlarmHost::new`].
/// Replacing or cancelling a key aborts its pending timer.
pub struct TimerAlarmHost<C> {
    runtime: Handle,
    clock: C,
    timers: Mutex<HashMap<TaskId, JoinHandle<()>>>,
    fired_tx: mpsc::UnboundedSender<ReminderPayload>,
}

impl<C: Clock> TimerAlarmHost<C> {
    pub fn new(runtime: Handle, clock: C) -> (Self, mpsc::UnboundedReceiver<ReminderPayload>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let host = Self {
            runtime,
            clock,
            timers: Mutex::new(HashMap::new()),
            fired_tx,
        };
        (host, fired_rx)
    }

    /// Number of timers that have not fired or been cancelled.
    pub fn pending_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock> AlarmHost for TimerAlarmHost<C> {
    fn register(
        &self,
        key: TaskId,
        trigger_at: DateTime<Local>,
        payload: ReminderPayload,
    ) -> Result<(), HostError> {
        if self.fired_tx.is_closed() {
            return Err(HostError::Unavailable(
                "reminder receiver was dropped".to_string(),
            ));
        }

        let delay = (trigger_at - self.clock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        let fired_tx = self.fired_tx.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver may be gone during shutdown; nothing to deliver to then.
            let _ = fired_tx.send(payload);
        });

        let mut timers = self.lock();
        timers.retain(|_, existing| !existing.is_finished());
        if let Some(previous) = timers.insert(key, handle) {
            previous.abort();
        }
        debug!(
            "event=timer_register module=reminder status=ok task_id={key} delay_ms={}",
            delay.as_millis()
        );
        Ok(())
    }

    fn cancel(&self, key: TaskId) {
        if let Some(handle) = self.lock().remove(&key) {
            handle.abort();
        }
    }
}
