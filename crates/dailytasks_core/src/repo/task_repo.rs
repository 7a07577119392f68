//! Task store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the durable `TaskId -> Task` mapping used by every use case.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Upsert replaces a task and its subtasks atomically.
//! - A nil task ID on upsert means "not yet stored"; the store assigns a
//!   fresh ID, which is never reused.

use crate::db::migrations::ensure_latest;
use crate::db::DbError;
use crate::model::task::{Category, Priority, Subtask, Task, TaskId, TaskValidationError};
use crate::model::time_of_day::TimeOfDay;
use log::debug;
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    start_time,
    end_time,
    category,
    priority
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable task store contract.
pub trait TaskRepository {
    /// Returns every stored task ordered by start time, then end time, then ID.
    fn list_tasks(&self) -> RepoResult<Vec<Task>>;
    /// Loads one task by ID.
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Inserts or replaces a task; assigns an ID when `task.id` is nil.
    fn upsert_task(&self, task: &Task) -> RepoResult<Task>;
    /// Removes a task and its subtasks.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
}

impl<R: TaskRepository + ?Sized> TaskRepository for &R {
    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        (**self).list_tasks()
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        (**self).get_task(id)
    }

    fn upsert_task(&self, task: &Task) -> RepoResult<Task> {
        (**self).upsert_task(task)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        (**self).delete_task(id)
    }
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates a repository over a migrated connection.
    ///
    /// # Errors
    /// - `RepoError::Db(DbError::SchemaNotReady)` when migrations did not run.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_latest(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let mut subtasks = load_all_subtasks(self.conn)?;

        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL} ORDER BY start_time ASC, end_time ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();

        while let Some(row) = rows.next()? {
            let mut task = parse_task_row(row)?;
            task.subtasks = subtasks.remove(&task.id).unwrap_or_default();
            task.validate()?;
            tasks.push(task);
        }

        Ok(tasks)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut task = parse_task_row(row)?;
        task.subtasks = load_subtasks(self.conn, id)?;
        task.validate()?;
        Ok(Some(task))
    }

    fn upsert_task(&self, task: &Task) -> RepoResult<Task> {
        let mut stored = task.clone();
        if stored.id.is_nil() {
            stored.id = Uuid::new_v4();
        }
        stored.validate()?;

        let id_text = stored.id.to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO tasks (
                uuid,
                title,
                start_time,
                end_time,
                category,
                priority
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (uuid) DO UPDATE SET
                title = excluded.title,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                category = excluded.category,
                priority = excluded.priority,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                id_text.as_str(),
                stored.title.as_str(),
                stored.start.format_24h(),
                stored.end.format_24h(),
                stored.category.map(Category::as_str),
                stored.priority.map(Priority::level),
            ],
        )?;

        tx.execute(
            "DELETE FROM subtasks WHERE task_uuid = ?1;",
            [id_text.as_str()],
        )?;
        for (position, subtask) in stored.subtasks.iter().enumerate() {
            tx.execute(
                "INSERT INTO subtasks (uuid, task_uuid, position, text, done)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    subtask.id.to_string(),
                    id_text.as_str(),
                    position as i64,
                    subtask.text.as_str(),
                    bool_to_int(subtask.done),
                ],
            )?;
        }
        tx.commit()?;

        debug!(
            "event=task_upsert module=repo status=ok task_id={} subtasks={}",
            stored.id,
            stored.subtasks.len()
        );
        Ok(stored)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        debug!("event=task_delete module=repo status=ok task_id={id}");
        Ok(())
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "tasks.uuid")?;

    let start_text: String = row.get("start_time")?;
    let start = TimeOfDay::parse(&start_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid start_time `{start_text}`: {err}"))
    })?;
    let end_text: String = row.get("end_time")?;
    let end = TimeOfDay::parse(&end_text)
        .map_err(|err| RepoError::InvalidData(format!("invalid end_time `{end_text}`: {err}")))?;

    let category = match row.get::<_, Option<String>>("category")? {
        Some(value) => Some(Category::parse(&value).map_err(|_| {
            RepoError::InvalidData(format!("invalid category `{value}` in tasks.category"))
        })?),
        None => None,
    };

    let priority = match row.get::<_, Option<i64>>("priority")? {
        Some(value) => {
            let level = u8::try_from(value).map_err(|_| {
                RepoError::InvalidData(format!("invalid priority `{value}` in tasks.priority"))
            })?;
            Some(Priority::from_level(level).map_err(|_| {
                RepoError::InvalidData(format!("invalid priority `{value}` in tasks.priority"))
            })?)
        }
        None => None,
    };

    Ok(Task {
        id,
        title: row.get("title")?,
        start,
        end,
        category,
        priority,
        subtasks: Vec::new(),
    })
}

fn load_subtasks(conn: &Connection, task_id: TaskId) -> RepoResult<Vec<Subtask>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, text, done
         FROM subtasks
         WHERE task_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([task_id.to_string()])?;
    let mut subtasks = Vec::new();
    while let Some(row) = rows.next()? {
        subtasks.push(parse_subtask_row(row)?);
    }
    Ok(subtasks)
}

fn load_all_subtasks(conn: &Connection) -> RepoResult<HashMap<TaskId, Vec<Subtask>>> {
    let mut stmt = conn.prepare(
        "SELECT task_uuid, uuid, text, done
         FROM subtasks
         ORDER BY task_uuid ASC, position ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut grouped: HashMap<TaskId, Vec<Subtask>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let task_text: String = row.get("task_uuid")?;
        let task_id = parse_uuid(&task_text, "subtasks.task_uuid")?;
        grouped
            .entry(task_id)
            .or_default()
            .push(parse_subtask_row(row)?);
    }
    Ok(grouped)
}

fn parse_subtask_row(row: &Row<'_>) -> RepoResult<Subtask> {
    let uuid_text: String = row.get("uuid")?;
    let done = match row.get::<_, i64>("done")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid done value `{other}` in subtasks.done"
            )));
        }
    };
    Ok(Subtask {
        id: parse_uuid(&uuid_text, "subtasks.uuid")?,
        text: row.get("text")?,
        done,
    })
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
