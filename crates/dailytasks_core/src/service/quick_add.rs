//! AI-assisted quick add and schedule digest.
//!
//! # Responsibility
//! - Turn free text into a task draft through an opaque completion endpoint.
//! - Render the day plan as plain text for the "optimize schedule" request.
//!
//! # Invariants
//! - Drafts are never persisted here; they go through `TaskService::submit`
//!   like any form input, so overlap rules still apply.
//! - A missing end time defaults to one hour after start, capped at `23:59`.

use crate::model::task::{Category, Priority, Task};
use crate::model::time_of_day::{TimeFormatError, TimeOfDay};
use crate::service::task_service::TaskForm;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?").expect("valid code fence regex"));

const DEFAULT_DURATION_MINUTES: u16 = 60;

/// Hosted text completion endpoint.
pub trait Completion {
    fn complete(&self, prompt: &str) -> Result<String, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickAddError {
    EmptyInput,
    /// Completion endpoint failed.
    Completion(String),
    /// Reply is not a JSON task object.
    Unparseable(String),
    MissingTitle,
    Time {
        field: &'static str,
        source: TimeFormatError,
    },
}

impl Display for QuickAddError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "quick add input is empty"),
            Self::Completion(message) => write!(f, "completion failed: {message}"),
            Self::Unparseable(message) => write!(f, "could not parse completion reply: {message}"),
            Self::MissingTitle => write!(f, "completion reply has no title"),
            Self::Time { field, source } => write!(f, "invalid {field} in completion reply: {source}"),
        }
    }
}

impl Error for QuickAddError {}

/// Candidate task produced by quick add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
}

impl TaskDraft {
    /// Converts the draft into create-form input.
    pub fn into_form(self) -> TaskForm {
        TaskForm {
            task_id: None,
            title: self.title,
            start: self.start.format_24h(),
            end: self.end.format_24h(),
            category: self.category.map(|category| category.as_str().to_string()),
            priority: self.priority.map(Priority::level),
            subtasks: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDraft {
    #[serde(default)]
    title: String,
    start: String,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    priority: Option<serde_json::Value>,
}

/// Builds the completion request for free-text quick add.
pub fn quick_add_prompt(input: &str, now: TimeOfDay) -> String {
    let categories = Category::ALL.map(Category::as_str).join(" | ");
    format!(
        "Parse this task into a JSON object: \"{input}\"\n\
         Fields: title (text), start (HH:MM, 24h), end (HH:MM, 24h), \
         category ({categories}), priority (1 | 2 | 3).\n\
         If no duration is given, use one hour.\n\
         Current time is {now}.\n\
         Return only the JSON."
    )
}

/// Parses a completion reply into a draft.
///
/// Markdown code fences and surrounding prose are ignored. Unknown
/// categories and out-of-range priorities are dropped rather than rejected.
pub fn parse_task_draft(reply: &str) -> Result<TaskDraft, QuickAddError> {
    let stripped = CODE_FENCE_RE.replace_all(reply, "");
    let trimmed = stripped.trim();
    let json = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(open), Some(close)) if open < close => &trimmed[open..=close],
        _ => return Err(QuickAddError::Unparseable("no JSON object found".to_string())),
    };

    let raw: RawDraft =
        serde_json::from_str(json).map_err(|err| QuickAddError::Unparseable(err.to_string()))?;

    let title = raw.title.trim().to_string();
    if title.is_empty() {
        return Err(QuickAddError::MissingTitle);
    }

    let start = TimeOfDay::parse(&raw.start).map_err(|source| QuickAddError::Time {
        field: "start",
        source,
    })?;
    let end = match raw.end.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => TimeOfDay::parse(value).map_err(|source| QuickAddError::Time {
            field: "end",
            source,
        })?,
        None => start.saturating_add_minutes(DEFAULT_DURATION_MINUTES),
    };

    let category = raw
        .category
        .as_deref()
        .and_then(|value| Category::parse(value).ok());
    let priority = raw.priority.as_ref().and_then(priority_from_json);

    Ok(TaskDraft {
        title,
        start,
        end,
        category,
        priority,
    })
}

/// Asks `completion` to turn `input` into a draft.
pub fn request_task_draft<A: Completion + ?Sized>(
    completion: &A,
    input: &str,
    now: TimeOfDay,
) -> Result<TaskDraft, QuickAddError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QuickAddError::EmptyInput);
    }

    let reply = completion
        .complete(&quick_add_prompt(input, now))
        .map_err(QuickAddError::Completion)?;
    debug!(
        "event=quick_add_reply module=service status=ok reply_chars={}",
        reply.chars().count()
    );

    let draft = parse_task_draft(&reply)?;
    info!(
        "event=quick_add module=service status=ok start={} end={}",
        draft.start, draft.end
    );
    Ok(draft)
}

/// One line per task: `- [Category] Title: 9:00 AM to 10:00 AM (Priority: 1)`.
pub fn schedule_digest(tasks: &[Task]) -> String {
    tasks
        .iter()
        .map(|task| {
            let category = task.category.unwrap_or(Category::Work);
            let priority = task
                .priority
                .map(|priority| priority.level().to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "- [{category}] {}: {} to {} (Priority: {priority})",
                task.title,
                task.start.format_12h(),
                task.end.format_12h()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn priority_from_json(value: &serde_json::Value) -> Option<Priority> {
    let level = match value {
        serde_json::Value::Number(number) => number.as_u64()?,
        serde_json::Value::String(text) => text.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    Priority::from_level(u8::try_from(level).ok()?).ok()
}
