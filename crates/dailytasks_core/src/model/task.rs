//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical time-blocked task record and its subtasks.
//! - Enforce record-level invariants before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another task; a nil `id` marks a
//!   task that has not been stored yet.
//! - `title` is non-empty after trimming.
//! - `start < end` (strict; zero-length tasks are rejected).

use crate::model::time_of_day::TimeOfDay;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a task.
///
/// Doubles as the reminder registration key, so store and scheduler share
/// one key space.
pub type TaskId = Uuid;

/// Stable identifier of a subtask within its parent task.
pub type SubtaskId = Uuid;

/// Record-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    /// `end <= start`.
    EndNotAfterStart { start: TimeOfDay, end: TimeOfDay },
    InvalidPriority(u8),
    UnknownCategory(String),
    EmptySubtaskText,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be empty"),
            Self::EndNotAfterStart { start, end } => {
                write!(f, "end before start: end {end} must be after start {start}")
            }
            Self::InvalidPriority(level) => {
                write!(f, "invalid priority {level}; expected 1, 2 or 3")
            }
            Self::UnknownCategory(value) => write!(f, "unknown category `{value}`"),
            Self::EmptySubtaskText => write!(f, "subtask text must not be empty"),
        }
    }
}

impl Error for TaskValidationError {}

/// Display category of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Work,
    Personal,
    Health,
    Urgent,
    Leisure,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Personal,
        Category::Health,
        Category::Urgent,
        Category::Leisure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Health => "Health",
            Self::Urgent => "Urgent",
            Self::Leisure => "Leisure",
        }
    }

    /// Parses a category label, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, TaskValidationError> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| TaskValidationError::UnknownCategory(trimmed.to_string()))
    }

    /// Accent color used by list and timeline views.
    pub fn color_hex(self) -> &'static str {
        match self {
            Self::Work => "#3b82f6",
            Self::Personal => "#8b5cf6",
            Self::Health => "#10b981",
            Self::Urgent => "#ef4444",
            Self::Leisure => "#f59e0b",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accent color for an optional category; uncategorized tasks use `Work`'s color.
pub fn category_color(category: Option<Category>) -> &'static str {
    category.unwrap_or(Category::Work).color_hex()
}

/// Task priority, stored as level `1` (high) to `3` (low).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Priority {
    pub fn from_level(level: u8) -> Result<Self, TaskValidationError> {
        match level {
            1 => Ok(Self::High),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Low),
            other => Err(TaskValidationError::InvalidPriority(other)),
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = TaskValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_level(value)
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.level()
    }
}

/// Checklist entry owned by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub text: String,
    pub done: bool,
}

impl Subtask {
    /// Creates an open subtask with a generated ID and trimmed text.
    pub fn new(text: impl AsRef<str>) -> Result<Self, TaskValidationError> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(TaskValidationError::EmptySubtaskText);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            text: text.to_string(),
            done: false,
        })
    }
}

/// Canonical time-blocked task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    /// Display order is insertion order.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Creates a validated task with a freshly generated ID.
    pub fn new(
        title: impl Into<String>,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4(), title, start, end)
    }

    /// Creates a validated task that has not been stored yet.
    ///
    /// The ID is nil until the store assigns one on first upsert.
    pub fn unsaved(
        title: impl Into<String>,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::nil(), title, start, end)
    }

    /// Creates a validated task with a caller-provided ID.
    ///
    /// Used by edit paths where the identity already exists.
    pub fn with_id(
        id: TaskId,
        title: impl Into<String>,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<Self, TaskValidationError> {
        let task = Self {
            id,
            title: title.into(),
            start,
            end,
            category: None,
            priority: None,
            subtasks: Vec::new(),
        };
        task.validate()?;
        Ok(task)
    }

    /// Checks record-level invariants.
    ///
    /// Overlap with other tasks is not checked here; see
    /// [`crate::planner::overlap`].
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        if self.end <= self.start {
            return Err(TaskValidationError::EndNotAfterStart {
                start: self.start,
                end: self.end,
            });
        }
        if self.subtasks.iter().any(|sub| sub.text.trim().is_empty()) {
            return Err(TaskValidationError::EmptySubtaskText);
        }
        Ok(())
    }

    /// Length of the task in minutes.
    pub fn duration_minutes(&self) -> u16 {
        self.end
            .minutes_since_midnight()
            .saturating_sub(self.start.minutes_since_midnight())
    }

    /// Whether the store has assigned this task an ID.
    pub fn is_stored(&self) -> bool {
        !self.id.is_nil()
    }

    /// Number of completed subtasks.
    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|sub| sub.done).count()
    }
}
