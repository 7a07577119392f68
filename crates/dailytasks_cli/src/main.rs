//! Command-line front end for the planner core.
//!
//! # Responsibility
//! - Manage the day plan from a terminal against the same store as the app.
//! - Run a foreground reminder loop (`watch`) backed by in-process timers.
//!
//! # Invariants
//! - Only `watch` delivers reminders. Other commands compute triggers and
//!   exit without leaving an alarm behind.
//! - `watch` arms reminders from the store when it starts; restart it to pick
//!   up tasks added or edited by another process.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use dailytasks_core::db::open_db;
use dailytasks_core::planner::day_view::{progress_percent, sort_for_display};
use dailytasks_core::reminder::host::TimerAlarmHost;
use dailytasks_core::service::quick_add::schedule_digest;
use dailytasks_core::{
    init_from_config, Clock, CoreConfig, DeliveryOutcome, HostError, InMemoryAlarmHost, Notifier,
    PastTriggerPolicy, ReminderDelivery, ReminderPayload, ReminderScheduler, ScheduleError,
    ServiceError,
    SqliteTaskRepository, SystemClock, TaskForm, TaskId, TaskService, TimeOfDay,
};
use std::path::PathBuf;
use tokio::runtime::Handle;

#[derive(Parser, Debug)]
#[command(name = "dailytasks", version, about = "Time-blocked daily planner")]
struct Cli {
    /// SQLite store path (overrides DAILYTASKS_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// What to do with reminders whose start time already passed today
    #[arg(long, global = true, value_parser = parse_policy)]
    past_trigger: Option<PastTriggerPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show today's tasks with progress
    List,
    /// Add a task, or edit one with --id
    Add {
        title: String,
        /// Start time, HH:MM
        start: String,
        /// End time, HH:MM
        end: String,
        #[arg(long)]
        id: Option<TaskId>,
        #[arg(long)]
        category: Option<String>,
        /// 1 (high) to 3 (low)
        #[arg(long)]
        priority: Option<u8>,
    },
    /// Delete a task and cancel its reminder
    Delete { id: TaskId },
    /// Add a subtask
    Subtask { task_id: TaskId, text: String },
    /// Mark a subtask done or open again
    Check {
        task_id: TaskId,
        subtask_id: TaskId,
        #[arg(long)]
        undo: bool,
    },
    /// Print where every task's next reminder would land
    Rearm,
    /// Print the day plan as plain text
    Digest,
    /// Stay in the foreground and print reminders as they fire
    Watch,
}

fn parse_policy(value: &str) -> Result<PastTriggerPolicy, String> {
    PastTriggerPolicy::parse(value)
        .ok_or_else(|| format!("unknown policy `{value}`; expected fire_immediately|next_day|decline"))
}

/// Prints fired reminders to stdout.
struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn show(&self, payload: &ReminderPayload) -> Result<(), HostError> {
        println!("[reminder] {}: {}", payload.title, payload.body());
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CoreConfig::from_env().context("invalid environment configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(policy) = cli.past_trigger {
        config.past_trigger_policy = policy;
    }
    init_from_config(&config).map_err(anyhow::Error::msg)?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let repo = SqliteTaskRepository::try_new(&conn)?;

    match cli.command {
        Command::Watch => watch(&repo, config.past_trigger_policy).await,
        command => {
            let host = InMemoryAlarmHost::new();
            let service = TaskService::new(
                &repo,
                ReminderScheduler::with_policy(&host, SystemClock, config.past_trigger_policy),
            );
            run(&service, command)
        }
    }
}

fn run(
    service: &TaskService<&SqliteTaskRepository<'_>, &InMemoryAlarmHost, SystemClock>,
    command: Command,
) -> Result<()> {
    match command {
        Command::List => {
            let now = current_time();
            let mut tasks = service.list_tasks()?;
            sort_for_display(&mut tasks);
            if tasks.is_empty() {
                println!("No tasks planned.");
            }
            for task in &tasks {
                let category = task
                    .category
                    .map(|category| category.as_str())
                    .unwrap_or("-");
                println!(
                    "{}  {:>8} - {:<8}  {:<9} {:>3}%  {}",
                    task.id,
                    task.start.format_12h(),
                    task.end.format_12h(),
                    category,
                    progress_percent(task, now),
                    task.title
                );
                for sub in &task.subtasks {
                    let mark = if sub.done { "x" } else { " " };
                    println!("    [{mark}] {} {}", sub.id, sub.text);
                }
            }
        }
        Command::Add {
            title,
            start,
            end,
            id,
            category,
            priority,
        } => {
            let form = TaskForm {
                task_id: id,
                title,
                start,
                end,
                category,
                priority,
                subtasks: None,
            };
            let outcome = match service.submit(&form) {
                Ok(outcome) => outcome,
                Err(ServiceError::Validation(err)) => bail!("rejected: {}", err.reason()),
                Err(err) => return Err(err.into()),
            };
            let verb = if outcome.created { "created" } else { "updated" };
            println!("{verb} {}", outcome.task.id);
            println!("{}", reminder_line(&outcome.reminder));
        }
        Command::Delete { id } => {
            service.delete_task(id)?;
            println!("deleted {id}");
        }
        Command::Subtask { task_id, text } => {
            let task = service.add_subtask(task_id, &text)?;
            println!("{} now has {} subtask(s)", task.id, task.subtasks.len());
        }
        Command::Check {
            task_id,
            subtask_id,
            undo,
        } => {
            let task = service.set_subtask_done(task_id, subtask_id, !undo)?;
            println!(
                "{}: {}/{} done",
                task.title,
                task.completed_subtasks(),
                task.subtasks.len()
            );
        }
        Command::Rearm => {
            let report = service.rearm_reminders()?;
            for (id, trigger_at) in &report.scheduled {
                println!("{id} -> would fire at {}", trigger_at.format("%Y-%m-%d %H:%M"));
            }
            if !report.scheduled.is_empty() {
                println!("reminders are delivered by `dailytasks watch`; restart it to apply changes");
            }
            for (id, err) in &report.failed {
                println!("{id} -> {err}");
            }
        }
        Command::Digest => println!("{}", schedule_digest(&service.list_tasks()?)),
        Command::Watch => bail!("watch needs the timer host"),
    }
    Ok(())
}

async fn watch(repo: &SqliteTaskRepository<'_>, policy: PastTriggerPolicy) -> Result<()> {
    let (host, mut fired) = TimerAlarmHost::new(Handle::current(), SystemClock);
    let scheduler = ReminderScheduler::with_policy(&host, SystemClock, policy);
    let service = TaskService::new(repo, scheduler);
    let delivery = ReminderDelivery::new(repo, StdoutNotifier);

    let report = service.rearm_reminders()?;
    println!(
        "watching {} reminder(s); press Ctrl+C to stop",
        report.scheduled.len()
    );
    if report.scheduled.is_empty() {
        return Ok(());
    }

    while let Some(payload) = fired.recv().await {
        if let DeliveryOutcome::TaskGone(id) = delivery.handle_fired(&payload)? {
            println!("[reminder] {id} was deleted; skipped");
        }
        // Fired alarms are one-shot; arm tomorrow's occurrence.
        if policy != PastTriggerPolicy::NextDay {
            continue;
        }
        if let Some(task) = service.get_task(payload.task_id)? {
            if let Err(err) = service.scheduler().schedule(&task) {
                eprintln!("[reminder] {}: {err}", task.id);
            }
        }
    }
    Ok(())
}

/// Describes a computed trigger; nothing is armed outside `watch`.
fn reminder_line(reminder: &Result<DateTime<Local>, ScheduleError>) -> String {
    match reminder {
        Ok(trigger_at) => format!(
            "next reminder would fire at {}; (re)start `dailytasks watch` to deliver it",
            trigger_at.format("%Y-%m-%d %H:%M")
        ),
        Err(err) => format!("no reminder: {err}"),
    }
}

fn current_time() -> TimeOfDay {
    TimeOfDay::from_naive_time(SystemClock.now().time())
}

#[cfg(test)]
mod tests {
    use super::reminder_line;
    use chrono::{Local, TimeZone};
    use dailytasks_core::{HostError, ScheduleError};

    #[test]
    fn reminder_line_reports_trigger_without_claiming_an_alarm() {
        let trigger_at = Local.with_ymd_and_hms(2026, 6, 15, 9, 30, 0).unwrap();

        let line = reminder_line(&Ok(trigger_at));

        assert_eq!(
            line,
            "next reminder would fire at 2026-06-15 09:30; (re)start `dailytasks watch` to deliver it"
        );
    }

    #[test]
    fn reminder_line_reports_schedule_error() {
        let err = ScheduleError::Host(HostError::PermissionDenied("off".to_string()));

        let line = reminder_line(&Err(err.clone()));

        assert_eq!(line, format!("no reminder: {err}"));
    }
}
