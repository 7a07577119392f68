//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose task, subtask and reminder use cases to Dart via FRB.
//! - Translate core results into flat response envelopes.
//! - Hand alarm registrations to Dart as commands; the platform
//!   notification plugin owns the real alarms.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every call opens the store fresh; no task state is cached here.
//! - Rejected submissions return `ok=false` with a stable `reason` and emit
//!   no alarm commands.

use chrono::{DateTime, Local};
use dailytasks_core::db::open_db;
use dailytasks_core::model::task::category_color;
use dailytasks_core::planner::day_view::{
    is_live, progress_percent, timeline_block, DEFAULT_PX_PER_HOUR,
};
use dailytasks_core::service::quick_add::{
    parse_task_draft, quick_add_prompt as quick_add_prompt_inner, schedule_digest,
};
use dailytasks_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AlarmHost, Clock, ConfigError, CoreConfig, DeliveryOutcome, HostError, Notifier,
    PastTriggerPolicy, ReminderDelivery, ReminderPayload, ReminderScheduler, ServiceError,
    SqliteTaskRepository, SystemClock, Task, TaskForm, TaskId, TaskService, TimeOfDay,
};
use log::warn;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};
use uuid::Uuid;

static CONFIG: OnceLock<Result<CoreConfig, ConfigError>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Alarm instruction for the Dart notification plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmCommand {
    /// `register` or `cancel`.
    pub action: String,
    /// Task ID; the plugin keys its alarm on this value.
    pub task_id: String,
    /// Trigger instant for `register`.
    pub trigger_epoch_ms: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskItem {
    pub id: String,
    pub text: String,
    pub done: bool,
}

/// Task projection for list and timeline views.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    /// `HH:MM`.
    pub start: String,
    /// `HH:MM`.
    pub end: String,
    /// `H:MM AM/PM`.
    pub start_label: String,
    pub end_label: String,
    pub category: Option<String>,
    pub color_hex: String,
    pub priority: Option<u8>,
    pub subtasks: Vec<SubtaskItem>,
    pub progress_percent: u8,
    pub live: bool,
    pub top_px: f32,
    pub height_px: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskListResponse {
    pub ok: bool,
    pub items: Vec<TaskItem>,
    pub message: String,
}

/// Envelope for task and subtask mutations.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskActionResponse {
    pub ok: bool,
    pub task: Option<TaskItem>,
    /// Stable rejection reason (`end before start`, `overlap`, `format`, ...).
    pub reason: Option<String>,
    pub message: String,
    /// Set when the task was saved but its reminder is not active.
    pub reminder_error: Option<String>,
    pub alarm_commands: Vec<AlarmCommand>,
}

impl TaskActionResponse {
    fn failure(reason: Option<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task: None,
            reason,
            message: message.into(),
            reminder_error: None,
            alarm_commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RearmResponse {
    pub ok: bool,
    pub scheduled: u32,
    pub failed: u32,
    pub message: String,
    pub alarm_commands: Vec<AlarmCommand>,
}

/// What Dart should show for a fired alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderFiredResponse {
    /// `false` when the task is gone or the lookup failed.
    pub show: bool,
    pub title: String,
    pub body: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickAddResponse {
    pub ok: bool,
    pub title: String,
    pub start: String,
    pub end: String,
    pub category: Option<String>,
    pub priority: Option<u8>,
    pub message: String,
}

/// Lists stored tasks in display order with live progress at `now` (`HH:MM`,
/// defaults to the current local time).
#[flutter_rust_bridge::frb(sync)]
pub fn task_list(now: Option<String>) -> TaskListResponse {
    let outcome = Backend::from_env().and_then(|backend| {
        let now = resolve_now(now.as_deref(), &SystemClock)?;
        backend
            .run(SystemClock, |service| service.list_tasks())
            .map(|(tasks, _)| (tasks, now))
    });
    match outcome {
        Ok((tasks, now)) => TaskListResponse {
            ok: true,
            message: format!("{} task(s).", tasks.len()),
            items: tasks.iter().map(|task| to_task_item(task, now)).collect(),
        },
        Err(err) => TaskListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("task_list failed: {}", err.message()),
        },
    }
}

/// Creates (`task_id=None`) or edits a task, then schedules its reminder.
///
/// # FFI contract
/// - Never panics.
/// - On rejection nothing is stored and `alarm_commands` is empty.
#[flutter_rust_bridge::frb(sync)]
pub fn task_submit(
    task_id: Option<String>,
    title: String,
    start: String,
    end: String,
    category: Option<String>,
    priority: Option<u8>,
) -> TaskActionResponse {
    Backend::from_env()
        .and_then(|backend| {
            let form = TaskForm {
                task_id: task_id.as_deref().map(parse_task_id).transpose()?,
                title,
                start,
                end,
                category,
                priority,
                subtasks: None,
            };
            backend.submit(&form, SystemClock)
        })
        .unwrap_or_else(|err| err.into_response("task_submit"))
}

/// Deletes a task and cancels its reminder.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(task_id: String) -> TaskActionResponse {
    Backend::from_env()
        .and_then(|backend| {
            let id = parse_task_id(&task_id)?;
            backend.delete(id)
        })
        .unwrap_or_else(|err| err.into_response("task_delete"))
}

/// Appends an open subtask.
#[flutter_rust_bridge::frb(sync)]
pub fn subtask_add(task_id: String, text: String) -> TaskActionResponse {
    Backend::from_env()
        .and_then(|backend| {
            let id = parse_task_id(&task_id)?;
            backend.update_task(|service| service.add_subtask(id, &text))
        })
        .unwrap_or_else(|err| err.into_response("subtask_add"))
}

/// Sets a subtask's done flag.
#[flutter_rust_bridge::frb(sync)]
pub fn subtask_set_done(task_id: String, subtask_id: String, done: bool) -> TaskActionResponse {
    Backend::from_env()
        .and_then(|backend| {
            let id = parse_task_id(&task_id)?;
            let sub_id = parse_task_id(&subtask_id)?;
            backend.update_task(|service| service.set_subtask_done(id, sub_id, done))
        })
        .unwrap_or_else(|err| err.into_response("subtask_set_done"))
}

/// Removes a subtask.
#[flutter_rust_bridge::frb(sync)]
pub fn subtask_remove(task_id: String, subtask_id: String) -> TaskActionResponse {
    Backend::from_env()
        .and_then(|backend| {
            let id = parse_task_id(&task_id)?;
            let sub_id = parse_task_id(&subtask_id)?;
            backend.update_task(|service| service.remove_subtask(id, sub_id))
        })
        .unwrap_or_else(|err| err.into_response("subtask_remove"))
}

/// Re-registers every stored task's reminder.
///
/// Dart calls this once per app start, before showing the day view.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_rearm_on_boot() -> RearmResponse {
    match Backend::from_env().and_then(|backend| backend.rearm(SystemClock)) {
        Ok(response) => response,
        Err(err) => RearmResponse {
            ok: false,
            scheduled: 0,
            failed: 0,
            message: format!("reminders_rearm_on_boot failed: {}", err.message()),
            alarm_commands: Vec::new(),
        },
    }
}

/// Resolves a fired alarm against current task data.
#[flutter_rust_bridge::frb(sync)]
pub fn reminder_fired(task_id: String) -> ReminderFiredResponse {
    let outcome = Backend::from_env().and_then(|backend| {
        let id = parse_task_id(&task_id)?;
        backend.fired(id)
    });
    match outcome {
        Ok(DeliveryOutcome::Delivered(payload)) => ReminderFiredResponse {
            show: true,
            body: payload.body(),
            title: payload.title,
            message: "Reminder delivered.".to_string(),
        },
        Ok(DeliveryOutcome::TaskGone(_)) => ReminderFiredResponse {
            show: false,
            title: String::new(),
            body: String::new(),
            message: "Task no longer exists.".to_string(),
        },
        Err(err) => ReminderFiredResponse {
            show: false,
            title: String::new(),
            body: String::new(),
            message: format!("reminder_fired failed: {}", err.message()),
        },
    }
}

/// Builds the completion prompt for free-text quick add.
#[flutter_rust_bridge::frb(sync)]
pub fn quick_add_prompt(input: String) -> String {
    let now = TimeOfDay::from_naive_time(SystemClock.now().time());
    quick_add_prompt_inner(input.trim(), now)
}

/// Parses the completion reply into form fields; nothing is stored.
#[flutter_rust_bridge::frb(sync)]
pub fn quick_add_parse(reply: String) -> QuickAddResponse {
    match parse_task_draft(&reply) {
        Ok(draft) => {
            let form = draft.into_form();
            QuickAddResponse {
                ok: true,
                title: form.title,
                start: form.start,
                end: form.end,
                category: form.category,
                priority: form.priority,
                message: "Draft ready.".to_string(),
            }
        }
        Err(err) => QuickAddResponse {
            ok: false,
            title: String::new(),
            start: String::new(),
            end: String::new(),
            category: None,
            priority: None,
            message: format!("quick_add_parse failed: {err}"),
        },
    }
}

/// Plain-text day plan used as input for a schedule review request.
#[flutter_rust_bridge::frb(sync)]
pub fn schedule_digest_text() -> String {
    match Backend::from_env().and_then(|backend| {
        backend
            .run(SystemClock, |service| service.list_tasks())
            .map(|(tasks, _)| tasks)
    }) {
        Ok(tasks) => schedule_digest(&tasks),
        Err(err) => {
            warn!(
                "event=schedule_digest module=ffi status=error error={}",
                err.message()
            );
            String::new()
        }
    }
}

/// Records alarm calls as commands for Dart to apply.
#[derive(Debug, Default)]
struct CommandAlarmHost {
    commands: Mutex<Vec<AlarmCommand>>,
}

impl CommandAlarmHost {
    fn drain(&self) -> Vec<AlarmCommand> {
        std::mem::take(&mut *self.commands.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, command: AlarmCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }
}

impl AlarmHost for CommandAlarmHost {
    fn register(
        &self,
        key: TaskId,
        trigger_at: DateTime<Local>,
        payload: ReminderPayload,
    ) -> Result<(), HostError> {
        self.push(AlarmCommand {
            action: "register".to_string(),
            task_id: key.to_string(),
            trigger_epoch_ms: Some(trigger_at.timestamp_millis()),
            body: Some(payload.body()),
            title: Some(payload.title),
        });
        Ok(())
    }

    fn cancel(&self, key: TaskId) {
        self.push(AlarmCommand {
            action: "cancel".to_string(),
            task_id: key.to_string(),
            trigger_epoch_ms: None,
            title: None,
            body: None,
        });
    }
}

/// Dart shows the returned payload itself.
struct ReturnToDart;

impl Notifier for ReturnToDart {
    fn show(&self, _payload: &ReminderPayload) -> Result<(), HostError> {
        Ok(())
    }
}

#[derive(Debug)]
enum CallError {
    Setup(String),
    InvalidId(String),
    Service(ServiceError),
}

impl CallError {
    fn message(&self) -> String {
        match self {
            Self::Setup(message) => message.clone(),
            Self::InvalidId(value) => format!("invalid id `{value}`"),
            Self::Service(err) => err.to_string(),
        }
    }

    fn reason(&self) -> Option<String> {
        match self {
            Self::Setup(_) => None,
            Self::InvalidId(_) => Some("invalid id".to_string()),
            Self::Service(ServiceError::Validation(err)) => Some(err.reason().to_string()),
            Self::Service(ServiceError::Format { .. }) => Some("format".to_string()),
            Self::Service(ServiceError::TaskNotFound(_) | ServiceError::SubtaskNotFound { .. }) => {
                Some("not found".to_string())
            }
            Self::Service(ServiceError::Repo(_)) => None,
        }
    }

    fn into_response(self, op: &str) -> TaskActionResponse {
        TaskActionResponse::failure(self.reason(), format!("{op} failed: {}", self.message()))
    }
}

impl From<ServiceError> for CallError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

type ApiService<'a, C> = TaskService<SqliteTaskRepository<'a>, &'a CommandAlarmHost, C>;

/// Store location and reminder policy for one call.
struct Backend {
    db_path: PathBuf,
    policy: PastTriggerPolicy,
}

impl Backend {
    fn from_env() -> Result<Self, CallError> {
        let config = CONFIG
            .get_or_init(CoreConfig::from_env)
            .clone()
            .map_err(|err| CallError::Setup(err.to_string()))?;
        Ok(Self {
            db_path: config.db_path,
            policy: config.past_trigger_policy,
        })
    }

    fn open(&self) -> Result<Connection, CallError> {
        open_db(&self.db_path).map_err(|err| CallError::Setup(format!("DB open failed: {err}")))
    }

    /// Runs `op` against a fresh service and returns the alarm commands it issued.
    fn run<C: Clock, T>(
        &self,
        clock: C,
        op: impl FnOnce(&ApiService<'_, C>) -> Result<T, ServiceError>,
    ) -> Result<(T, Vec<AlarmCommand>), CallError> {
        let conn = self.open()?;
        let repo = SqliteTaskRepository::try_new(&conn)
            .map_err(|err| CallError::Setup(format!("repo init failed: {err}")))?;
        let host = CommandAlarmHost::default();
        let service = TaskService::new(repo, ReminderScheduler::with_policy(&host, clock, self.policy));
        let value = op(&service)?;
        Ok((value, host.drain()))
    }

    fn submit<C: Clock>(&self, form: &TaskForm, clock: C) -> Result<TaskActionResponse, CallError> {
        let now = TimeOfDay::from_naive_time(clock.now().time());
        let (outcome, commands) = self.run(clock, |service| service.submit(form))?;
        Ok(TaskActionResponse {
            ok: true,
            message: if outcome.created {
                "Task created.".to_string()
            } else {
                "Task updated.".to_string()
            },
            task: Some(to_task_item(&outcome.task, now)),
            reason: None,
            reminder_error: outcome.reminder.err().map(|err| err.to_string()),
            alarm_commands: commands,
        })
    }

    fn delete(&self, task_id: TaskId) -> Result<TaskActionResponse, CallError> {
        let ((), commands) = self.run(SystemClock, |service| service.delete_task(task_id))?;
        Ok(TaskActionResponse {
            ok: true,
            task: None,
            reason: None,
            message: "Task deleted.".to_string(),
            reminder_error: None,
            alarm_commands: commands,
        })
    }

    fn update_task(
        &self,
        op: impl FnOnce(&ApiService<'_, SystemClock>) -> Result<Task, ServiceError>,
    ) -> Result<TaskActionResponse, CallError> {
        let now = TimeOfDay::from_naive_time(SystemClock.now().time());
        let (task, commands) = self.run(SystemClock, op)?;
        Ok(TaskActionResponse {
            ok: true,
            task: Some(to_task_item(&task, now)),
            reason: None,
            message: "Task updated.".to_string(),
            reminder_error: None,
            alarm_commands: commands,
        })
    }

    fn rearm<C: Clock>(&self, clock: C) -> Result<RearmResponse, CallError> {
        let (report, commands) = self.run(clock, |service| service.rearm_reminders())?;
        Ok(RearmResponse {
            ok: true,
            scheduled: report.scheduled.len() as u32,
            failed: report.failed.len() as u32,
            message: format!("Rearmed {} of {} reminder(s).", report.scheduled.len(), report.total()),
            alarm_commands: commands,
        })
    }

    fn fired(&self, task_id: TaskId) -> Result<DeliveryOutcome, CallError> {
        let conn = self.open()?;
        let repo = SqliteTaskRepository::try_new(&conn)
            .map_err(|err| CallError::Setup(format!("repo init failed: {err}")))?;
        ReminderDelivery::new(repo, ReturnToDart)
            .handle_fired_id(task_id)
            .map_err(|err| CallError::Setup(err.to_string()))
    }
}

fn parse_task_id(value: &str) -> Result<TaskId, CallError> {
    Uuid::parse_str(value.trim()).map_err(|_| CallError::InvalidId(value.to_string()))
}

fn resolve_now(now: Option<&str>, clock: &impl Clock) -> Result<TimeOfDay, CallError> {
    match now.map(str::trim).filter(|value| !value.is_empty()) {
        Some(text) => TimeOfDay::parse(text).map_err(|source| {
            CallError::Service(ServiceError::Format {
                field: "now",
                source,
            })
        }),
        None => Ok(TimeOfDay::from_naive_time(clock.now().time())),
    }
}

fn to_task_item(task: &Task, now: TimeOfDay) -> TaskItem {
    let block = timeline_block(task, DEFAULT_PX_PER_HOUR);
    TaskItem {
        id: task.id.to_string(),
        title: task.title.clone(),
        start: task.start.format_24h(),
        end: task.end.format_24h(),
        start_label: task.start.format_12h(),
        end_label: task.end.format_12h(),
        category: task.category.map(|category| category.as_str().to_string()),
        color_hex: category_color(task.category).to_string(),
        priority: task.priority.map(|priority| priority.level()),
        subtasks: task
            .subtasks
            .iter()
            .map(|sub| SubtaskItem {
                id: sub.id.to_string(),
                text: sub.text.clone(),
                done: sub.done,
            })
            .collect(),
        progress_percent: progress_percent(task, now),
        live: is_live(task, now),
        top_px: block.top_px,
        height_px: block.height_px,
    }
}
