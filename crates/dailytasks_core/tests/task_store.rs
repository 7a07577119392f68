use dailytasks_core::db::open_db_in_memory;
use dailytasks_core::{
    Category, Priority, RepoError, SqliteTaskRepository, Subtask, Task, TaskRepository,
    TaskValidationError, TimeOfDay,
};
use rusqlite::Connection;
use uuid::Uuid;

fn t(text: &str) -> TimeOfDay {
    TimeOfDay::parse(text).unwrap()
}

#[test]
fn upsert_assigns_id_to_unsaved_task() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let draft = Task::unsaved("Standup", t("09:00"), t("09:15")).unwrap();
    assert!(!draft.is_stored());

    let stored = repo.upsert_task(&draft).unwrap();
    assert!(stored.is_stored());

    let loaded = repo.get_task(stored.id).unwrap().unwrap();
    assert_eq!(loaded, stored);
}

#[test]
fn upsert_roundtrip_preserves_optional_fields_and_subtasks() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let mut task = Task::new("Write report", t("13:00"), t("15:30")).unwrap();
    task.category = Some(Category::Work);
    task.priority = Some(Priority::High);
    task.subtasks = vec![
        Subtask::new("outline").unwrap(),
        Subtask::new("draft").unwrap(),
    ];
    task.subtasks[0].done = true;
    repo.upsert_task(&task).unwrap();

    let loaded = repo.get_task(task.id).unwrap().unwrap();
    assert_eq!(loaded, task);
    assert_eq!(loaded.completed_subtasks(), 1);
    assert_eq!(loaded.subtasks[1].text, "draft");
}

#[test]
fn upsert_with_existing_id_replaces_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let mut task = Task::new("Gym", t("18:00"), t("19:00")).unwrap();
    task.subtasks.push(Subtask::new("stretch").unwrap());
    repo.upsert_task(&task).unwrap();

    task.title = "Evening gym".to_string();
    task.end = t("19:30");
    task.subtasks.clear();
    repo.upsert_task(&task).unwrap();

    let all = repo.list_tasks().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Evening gym");
    assert_eq!(all[0].end, t("19:30"));
    assert!(all[0].subtasks.is_empty());
}

#[test]
fn list_is_ordered_by_start_time() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    for (title, start, end) in [
        ("lunch", "12:00", "13:00"),
        ("commute", "07:30", "08:15"),
        ("focus", "09:00", "11:00"),
    ] {
        repo.upsert_task(&Task::new(title, t(start), t(end)).unwrap())
            .unwrap();
    }

    let titles = repo
        .list_tasks()
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["commute", "focus", "lunch"]);
}

#[test]
fn delete_removes_task_and_cascades_subtasks() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let mut task = Task::new("Groceries", t("17:00"), t("17:45")).unwrap();
    task.subtasks.push(Subtask::new("milk").unwrap());
    repo.upsert_task(&task).unwrap();

    repo.delete_task(task.id).unwrap();

    assert!(repo.get_task(task.id).unwrap().is_none());
    assert_eq!(subtask_rows(&conn), 0);
}

#[test]
fn delete_unknown_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    let err = repo.delete_task(missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn invalid_task_is_rejected_before_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let mut task = Task::new("Nap", t("14:00"), t("14:30")).unwrap();
    task.end = t("13:00");

    let err = repo.upsert_task(&task).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(TaskValidationError::EndNotAfterStart { .. })
    ));
    assert!(repo.list_tasks().unwrap().is_empty());
}

#[test]
fn corrupted_row_is_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let task = Task::new("Read", t("21:00"), t("22:00")).unwrap();
    repo.upsert_task(&task).unwrap();

    conn.execute(
        "UPDATE tasks SET category = 'Chores' WHERE uuid = ?1;",
        [task.id.to_string()],
    )
    .unwrap();

    let err = repo.get_task(task.id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

fn subtask_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM subtasks;", [], |row| row.get(0))
        .unwrap()
}
