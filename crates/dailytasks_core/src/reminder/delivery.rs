//! Reminder fire handling.
//!
//! # Responsibility
//! - Turn a fired registration into a user-visible notification.
//!
//! # Invariants
//! - The payload captured at registration is never shown as-is: the task is
//!   re-read by ID so edits made after scheduling are reflected.
//! - A reminder for a deleted task is dropped silently.
//! - Delivery is attempted once; failures are returned, not retried.

use crate::model::task::TaskId;
use crate::repo::task_repo::{RepoError, TaskRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

use super::host::{HostError, ReminderPayload};

/// Displays a notification on the host.
pub trait Notifier {
    fn show(&self, payload: &ReminderPayload) -> Result<(), HostError>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn show(&self, payload: &ReminderPayload) -> Result<(), HostError> {
        (**self).show(payload)
    }
}

/// Result of handling one fired reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Notification shown with payload built from current task data.
    Delivered(ReminderPayload),
    /// Task no longer exists; nothing shown.
    TaskGone(TaskId),
}

#[derive(Debug)]
pub enum DeliveryError {
    Repo(RepoError),
    Notifier(HostError),
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Notifier(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DeliveryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Notifier(err) => Some(err),
        }
    }
}

impl From<RepoError> for DeliveryError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Resolves fired reminders against the store and shows them.
pub struct ReminderDelivery<R, N> {
    repo: R,
    notifier: N,
}

impl<R: TaskRepository, N: Notifier> ReminderDelivery<R, N> {
    pub fn new(repo: R, notifier: N) -> Self {
        Self { repo, notifier }
    }

    /// Handles a fired registration identified by `fired.task_id`.
    pub fn handle_fired(&self, fired: &ReminderPayload) -> Result<DeliveryOutcome, DeliveryError> {
        self.handle_fired_id(fired.task_id)
    }

    /// Handles a fired registration for `task_id`.
    pub fn handle_fired_id(&self, task_id: TaskId) -> Result<DeliveryOutcome, DeliveryError> {
        let Some(task) = self.repo.get_task(task_id)? else {
            info!("event=reminder_fire module=reminder status=dropped task_id={task_id} reason=task_gone");
            return Ok(DeliveryOutcome::TaskGone(task_id));
        };

        let payload = ReminderPayload::for_task(&task);
        if let Err(err) = self.notifier.show(&payload) {
            warn!("event=reminder_fire module=reminder status=error task_id={task_id} error={err}");
            return Err(DeliveryError::Notifier(err));
        }

        info!("event=reminder_fire module=reminder status=ok task_id={task_id}");
        Ok(DeliveryOutcome::Delivered(payload))
    }
}
