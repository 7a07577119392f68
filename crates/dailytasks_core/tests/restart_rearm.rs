use chrono::{DateTime, Duration, Local, TimeZone};
use dailytasks_core::db::open_db_in_memory;
use dailytasks_core::reminder::rearm::rearm_all;
use dailytasks_core::{
    FixedClock, InMemoryAlarmHost, PastTriggerPolicy, ReminderScheduler, ScheduleError,
    SqliteTaskRepository, Task, TaskRepository, TimeOfDay,
};
use std::collections::HashSet;

fn at(hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 6, 16, hour, minute, 0)
        .unwrap()
}

fn seed(repo: &SqliteTaskRepository<'_>) -> Vec<Task> {
    [
        ("Breakfast", "07:00", "07:30"),
        ("Deep work", "09:00", "11:00"),
        ("Run", "18:00", "19:00"),
    ]
    .into_iter()
    .map(|(title, start, end)| {
        let task = Task::new(
            title,
            TimeOfDay::parse(start).unwrap(),
            TimeOfDay::parse(end).unwrap(),
        )
        .unwrap();
        repo.upsert_task(&task).unwrap()
    })
    .collect()
}

#[test]
fn rearm_registers_every_stored_task_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let tasks = seed(&repo);

    let host = InMemoryAlarmHost::new();
    let clock = FixedClock::new(at(6, 0));
    let scheduler = ReminderScheduler::new(&host, &clock);

    // Breakfast fired before the restart; the host lost everything.
    scheduler.schedule(&tasks[0]).unwrap();
    assert_eq!(host.take_due(at(7, 0)).len(), 1);
    scheduler.schedule(&tasks[1]).unwrap();
    clock.set(at(8, 0));
    host.clear();

    let report = rearm_all(&repo, &scheduler).unwrap();

    assert_eq!(report.total(), 3);
    assert!(report.failed.is_empty());
    assert_eq!(host.len(), 3);
    let keys = host
        .registrations()
        .into_iter()
        .map(|registration| registration.key)
        .collect::<HashSet<_>>();
    let expected = tasks.iter().map(|task| task.id).collect::<HashSet<_>>();
    assert_eq!(keys, expected);

    let breakfast = host.registration(tasks[0].id).unwrap();
    assert_eq!(breakfast.trigger_at, at(7, 0) + Duration::days(1));
}

#[test]
fn rearm_twice_does_not_duplicate_registrations() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    seed(&repo);

    let host = InMemoryAlarmHost::new();
    let scheduler = ReminderScheduler::new(&host, FixedClock::new(at(6, 0)));

    rearm_all(&repo, &scheduler).unwrap();
    rearm_all(&repo, &scheduler).unwrap();

    assert_eq!(host.len(), 3);
}

#[test]
fn rearm_reports_declined_tasks_without_stopping() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let tasks = seed(&repo);

    let host = InMemoryAlarmHost::new();
    let scheduler = ReminderScheduler::with_policy(
        &host,
        FixedClock::new(at(12, 0)),
        PastTriggerPolicy::Decline,
    );

    let report = rearm_all(&repo, &scheduler).unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.scheduled.len(), 1);
    assert_eq!(report.scheduled[0].0, tasks[2].id);
    assert!(report
        .failed
        .iter()
        .all(|(_, err)| matches!(err, ScheduleError::PastTrigger { .. })));
    assert_eq!(host.len(), 1);
}
