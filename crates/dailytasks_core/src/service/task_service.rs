//! Task use-case service.
//!
//! # Responsibility
//! - Orchestrate create/edit submissions: normalize, validate, check
//!   overlap, persist, schedule.
//! - Keep the reminder registration in step with every task mutation.
//!
//! # Invariants
//! - Validation and overlap checks run before any mutation; a rejected
//!   submission leaves store and scheduler untouched.
//! - A reminder failure never rolls back a persisted task; it is reported in
//!   [`SubmitOutcome::reminder`].
//! - The task ID is the key used for both the store and the scheduler.

use crate::model::task::{
    Category, Priority, Subtask, SubtaskId, Task, TaskId, TaskValidationError,
};
use crate::model::time_of_day::{TimeFormatError, TimeOfDay};
use crate::planner::overlap::find_conflict;
use crate::reminder::clock::Clock;
use crate::reminder::host::AlarmHost;
use crate::reminder::rearm::{rearm_all, RearmReport};
use crate::reminder::scheduler::{ReminderScheduler, ScheduleError};
use crate::repo::task_repo::{RepoError, TaskRepository};
use chrono::{DateTime, Local};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Reason a submission was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `end <= start`.
    EndBeforeStart { start: TimeOfDay, end: TimeOfDay },
    /// Candidate interval intersects an existing task.
    Overlap { conflicting_id: TaskId },
    /// Other record-level rule (title, priority, category, subtasks).
    Invalid(TaskValidationError),
}

impl ValidationError {
    /// Short stable reason string surfaced to callers.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EndBeforeStart { .. } => "end before start",
            Self::Overlap { .. } => "overlap",
            Self::Invalid(TaskValidationError::EmptyTitle) => "empty title",
            Self::Invalid(TaskValidationError::InvalidPriority(_)) => "invalid priority",
            Self::Invalid(TaskValidationError::UnknownCategory(_)) => "unknown category",
            Self::Invalid(TaskValidationError::EmptySubtaskText) => "empty subtask",
            Self::Invalid(TaskValidationError::EndNotAfterStart { .. }) => "end before start",
        }
    }
}

impl From<TaskValidationError> for ValidationError {
    fn from(value: TaskValidationError) -> Self {
        match value {
            TaskValidationError::EndNotAfterStart { start, end } => {
                Self::EndBeforeStart { start, end }
            }
            other => Self::Invalid(other),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

impl Error for ValidationError {}

/// Service error for task use cases.
#[derive(Debug)]
pub enum ServiceError {
    /// A time field is not valid `HH:MM`.
    Format {
        field: &'static str,
        source: TimeFormatError,
    },
    Validation(ValidationError),
    TaskNotFound(TaskId),
    SubtaskNotFound { task_id: TaskId, subtask_id: SubtaskId },
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format { field, source } => write!(f, "invalid {field} time: {source}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::SubtaskNotFound {
                task_id,
                subtask_id,
            } => write!(f, "subtask {subtask_id} not found in task {task_id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Format { source, .. } => Some(source),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::TaskNotFound(_) | Self::SubtaskNotFound { .. } => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::TaskNotFound(id),
            RepoError::Validation(err) => Self::Validation(err.into()),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TaskValidationError> for ServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Raw create/edit input as entered in the task form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    /// `Some` when editing an existing task.
    pub task_id: Option<TaskId>,
    pub title: String,
    /// `HH:MM`, 24-hour.
    pub start: String,
    /// `HH:MM`, 24-hour.
    pub end: String,
    pub category: Option<String>,
    pub priority: Option<u8>,
    /// `None` keeps existing subtasks on edit.
    pub subtasks: Option<Vec<Subtask>>,
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Task as persisted, with its store-assigned ID.
    pub task: Task,
    pub created: bool,
    /// Trigger instant of the registered reminder, or why none is active.
    pub reminder: Result<DateTime<Local>, ScheduleError>,
}

/// Use-case facade over the task store and reminder scheduler.
pub struct TaskService<R, H, C> {
    repo: R,
    scheduler: ReminderScheduler<H, C>,
}

impl<R: TaskRepository, H: AlarmHost, C: Clock> TaskService<R, H, C> {
    pub fn new(repo: R, scheduler: ReminderScheduler<H, C>) -> Self {
        Self { repo, scheduler }
    }

    pub fn scheduler(&self) -> &ReminderScheduler<H, C> {
        &self.scheduler
    }

    /// Lists all tasks ordered by start time.
    pub fn list_tasks(&self) -> ServiceResult<Vec<Task>> {
        Ok(self.repo.list_tasks()?)
    }

    pub fn get_task(&self, id: TaskId) -> ServiceResult<Option<Task>> {
        Ok(self.repo.get_task(id)?)
    }

    /// Validates and persists a create/edit form, then (re)schedules its reminder.
    ///
    /// # Errors
    /// - `Format` for malformed time text.
    /// - `Validation` with reason `end before start` or `overlap` (and other
    ///   record-level reasons); nothing is persisted in that case.
    /// - `TaskNotFound` when editing an unknown ID.
    pub fn submit(&self, form: &TaskForm) -> ServiceResult<SubmitOutcome> {
        let candidate = match self.normalize(form) {
            Ok(candidate) => candidate,
            Err(err) => {
                info!(
                    "event=task_submit module=service status=rejected editing={} reason={}",
                    form.task_id.is_some(),
                    rejection_reason(&err)
                );
                return Err(err);
            }
        };

        let existing = self.repo.list_tasks()?;
        if let Some(conflict) = find_conflict(&candidate, &existing, form.task_id) {
            info!(
                "event=task_submit module=service status=rejected editing={} reason=overlap conflicting_id={}",
                form.task_id.is_some(),
                conflict.id
            );
            return Err(ValidationError::Overlap {
                conflicting_id: conflict.id,
            }
            .into());
        }

        let task = self.repo.upsert_task(&candidate)?;
        let reminder = self.scheduler.schedule(&task);
        if let Err(err) = &reminder {
            warn!(
                "event=task_submit module=service status=ok task_id={} reminder=inactive error={err}",
                task.id
            );
        } else {
            info!(
                "event=task_submit module=service status=ok task_id={} created={}",
                task.id,
                form.task_id.is_none()
            );
        }

        Ok(SubmitOutcome {
            task,
            created: form.task_id.is_none(),
            reminder,
        })
    }

    /// Deletes a task and cancels its reminder.
    pub fn delete_task(&self, id: TaskId) -> ServiceResult<()> {
        self.repo.delete_task(id)?;
        self.scheduler.cancel(id);
        info!("event=task_delete module=service status=ok task_id={id}");
        Ok(())
    }

    /// Appends an open subtask.
    pub fn add_subtask(&self, task_id: TaskId, text: &str) -> ServiceResult<Task> {
        let mut task = self.require_task(task_id)?;
        task.subtasks.push(Subtask::new(text)?);
        Ok(self.repo.upsert_task(&task)?)
    }

    /// Sets a subtask's done flag.
    pub fn set_subtask_done(
        &self,
        task_id: TaskId,
        subtask_id: SubtaskId,
        done: bool,
    ) -> ServiceResult<Task> {
        let mut task = self.require_task(task_id)?;
        let subtask = task
            .subtasks
            .iter_mut()
            .find(|sub| sub.id == subtask_id)
            .ok_or(ServiceError::SubtaskNotFound {
                task_id,
                subtask_id,
            })?;
        subtask.done = done;
        Ok(self.repo.upsert_task(&task)?)
    }

    /// Removes a subtask.
    pub fn remove_subtask(&self, task_id: TaskId, subtask_id: SubtaskId) -> ServiceResult<Task> {
        let mut task = self.require_task(task_id)?;
        let before = task.subtasks.len();
        task.subtasks.retain(|sub| sub.id != subtask_id);
        if task.subtasks.len() == before {
            return Err(ServiceError::SubtaskNotFound {
                task_id,
                subtask_id,
            });
        }
        Ok(self.repo.upsert_task(&task)?)
    }

    /// Re-registers every stored task's reminder (host restart signal).
    pub fn rearm_reminders(&self) -> ServiceResult<RearmReport> {
        Ok(rearm_all(&self.repo, &self.scheduler)?)
    }

    fn require_task(&self, id: TaskId) -> ServiceResult<Task> {
        self.repo
            .get_task(id)?
            .ok_or(ServiceError::TaskNotFound(id))
    }

    fn normalize(&self, form: &TaskForm) -> ServiceResult<Task> {
        let start = TimeOfDay::parse(&form.start).map_err(|source| ServiceError::Format {
            field: "start",
            source,
        })?;
        let end = TimeOfDay::parse(&form.end).map_err(|source| ServiceError::Format {
            field: "end",
            source,
        })?;
        if end <= start {
            return Err(ValidationError::EndBeforeStart { start, end }.into());
        }

        let category = form
            .category
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(Category::parse)
            .transpose()?;
        let priority = form.priority.map(Priority::from_level).transpose()?;

        let mut candidate = match form.task_id {
            Some(id) => self.require_task(id)?,
            None => Task {
                id: Uuid::nil(),
                title: String::new(),
                start,
                end,
                category: None,
                priority: None,
                subtasks: Vec::new(),
            },
        };
        candidate.title = form.title.trim().to_string();
        candidate.start = start;
        candidate.end = end;
        candidate.category = category;
        candidate.priority = priority;
        if let Some(subtasks) = &form.subtasks {
            candidate.subtasks = subtasks.clone();
        }

        candidate.validate()?;
        Ok(candidate)
    }
}

fn rejection_reason(err: &ServiceError) -> String {
    match err {
        ServiceError::Format { field, .. } => format!("format_{field}"),
        ServiceError::Validation(validation) => validation.reason().replace(' ', "_"),
        ServiceError::TaskNotFound(_) | ServiceError::SubtaskNotFound { .. } => {
            "not_found".to_string()
        }
        ServiceError::Repo(_) => "repo".to_string(),
    }
}
