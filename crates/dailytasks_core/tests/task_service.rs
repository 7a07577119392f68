use chrono::{DateTime, Local, TimeZone};
use dailytasks_core::db::open_db_in_memory;
use dailytasks_core::reminder::delivery::DeliveryError;
use dailytasks_core::{
    DeliveryOutcome, FixedClock, HostError, InMemoryAlarmHost, Notifier, ReminderDelivery,
    ReminderPayload, ReminderScheduler, ScheduleError, ServiceError, SqliteTaskRepository,
    Subtask, TaskForm, TaskService, ValidationError,
};
use std::sync::Mutex;
use uuid::Uuid;

fn at(hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 6, 17, hour, minute, 0)
        .unwrap()
}

fn form(title: &str, start: &str, end: &str) -> TaskForm {
    TaskForm {
        title: title.to_string(),
        start: start.to_string(),
        end: end.to_string(),
        ..TaskForm::default()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    shown: Mutex<Vec<ReminderPayload>>,
}

impl Notifier for RecordingNotifier {
    fn show(&self, payload: &ReminderPayload) -> Result<(), HostError> {
        self.shown.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

#[test]
fn submit_persists_and_schedules() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));

    let mut input = form("  Standup ", "9:00", "09:15");
    input.category = Some("work".to_string());
    input.priority = Some(1);
    let outcome = service.submit(&input).unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.task.title, "Standup");
    assert_eq!(outcome.reminder, Ok(at(9, 0)));
    assert!(host.registration(outcome.task.id).is_some());
    assert_eq!(service.list_tasks().unwrap(), vec![outcome.task]);
}

#[test]
fn end_before_start_is_rejected_without_mutation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));

    let err = service.submit(&form("Backwards", "10:00", "10:00")).unwrap_err();

    match err {
        ServiceError::Validation(validation) => {
            assert_eq!(validation.reason(), "end before start");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.list_tasks().unwrap().is_empty());
    assert!(host.is_empty());
}

#[test]
fn overlap_is_rejected_without_mutation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));
    let first = service.submit(&form("Meeting", "09:00", "10:00")).unwrap();

    let err = service.submit(&form("Clash", "09:30", "09:45")).unwrap_err();

    match err {
        ServiceError::Validation(ValidationError::Overlap { conflicting_id }) => {
            assert_eq!(conflicting_id, first.task.id);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.list_tasks().unwrap().len(), 1);
    assert_eq!(host.len(), 1);

    service.submit(&form("After", "10:00", "11:00")).unwrap();
    service.submit(&form("Before", "08:00", "09:00")).unwrap();
    assert_eq!(service.list_tasks().unwrap().len(), 3);
}

#[test]
fn malformed_time_is_a_format_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));

    let err = service.submit(&form("Typo", "9h00", "10:00")).unwrap_err();

    assert!(matches!(err, ServiceError::Format { field: "start", .. }));
}

#[test]
fn editing_keeps_id_and_reschedules() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));
    let created = service.submit(&form("Gym", "17:00", "18:00")).unwrap();

    let mut edit = form("Gym", "17:30", "18:30");
    edit.task_id = Some(created.task.id);
    let edited = service.submit(&edit).unwrap();

    assert!(!edited.created);
    assert_eq!(edited.task.id, created.task.id);
    assert_eq!(host.len(), 1);
    assert_eq!(
        host.registration(created.task.id).unwrap().trigger_at,
        at(17, 30)
    );
}

#[test]
fn editing_unknown_task_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));

    let mut edit = form("Ghost", "12:00", "13:00");
    let missing = Uuid::new_v4();
    edit.task_id = Some(missing);

    let err = service.submit(&edit).unwrap_err();
    assert!(matches!(err, ServiceError::TaskNotFound(id) if id == missing));
}

#[test]
fn host_failure_keeps_task_persisted() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::rejecting(HostError::PermissionDenied("off".to_string()));
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));

    let outcome = service.submit(&form("Pills", "08:00", "08:05")).unwrap();

    assert!(matches!(outcome.reminder, Err(ScheduleError::Host(_))));
    assert!(service.get_task(outcome.task.id).unwrap().is_some());
}

#[test]
fn delete_cancels_reminder() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));
    let created = service.submit(&form("Dentist", "15:00", "16:00")).unwrap();

    service.delete_task(created.task.id).unwrap();

    assert!(host.is_empty());
    assert!(service.list_tasks().unwrap().is_empty());
    assert!(matches!(
        service.delete_task(created.task.id),
        Err(ServiceError::TaskNotFound(_))
    ));
}

#[test]
fn subtask_operations_persist() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));
    let mut input = form("Trip prep", "19:00", "20:00");
    input.subtasks = Some(vec![Subtask::new("passport").unwrap()]);
    let id = service.submit(&input).unwrap().task.id;

    let task = service.add_subtask(id, "charger").unwrap();
    assert_eq!(task.subtasks.len(), 2);

    let charger = task.subtasks[1].id;
    let task = service.set_subtask_done(id, charger, true).unwrap();
    assert_eq!(task.completed_subtasks(), 1);

    let passport = task.subtasks[0].id;
    let task = service.remove_subtask(id, passport).unwrap();
    assert_eq!(task.subtasks.len(), 1);
    assert_eq!(task.subtasks[0].text, "charger");

    assert!(matches!(
        service.remove_subtask(id, passport),
        Err(ServiceError::SubtaskNotFound { .. })
    ));
    assert!(service.add_subtask(id, "   ").is_err());
}

#[test]
fn delivery_reads_current_task_and_drops_deleted_ones() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let clock = FixedClock::new(at(7, 0));
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, &clock));
    let notifier = RecordingNotifier::default();
    let delivery = ReminderDelivery::new(&repo, &notifier);

    let created = service.submit(&form("Call mom", "09:00", "09:20")).unwrap();
    let stale = host.registration(created.task.id).unwrap().payload;

    // Rename after scheduling without touching the alarm.
    let mut edit = form("Call mom and dad", "09:00", "09:20");
    edit.task_id = Some(created.task.id);
    service.submit(&edit).unwrap();

    let outcome = delivery.handle_fired(&stale).unwrap();
    match outcome {
        DeliveryOutcome::Delivered(payload) => assert_eq!(payload.title, "Call mom and dad"),
        other => panic!("unexpected outcome: {other:?}"),
    }

    service.delete_task(created.task.id).unwrap();
    assert_eq!(
        delivery.handle_fired(&stale).unwrap(),
        DeliveryOutcome::TaskGone(created.task.id)
    );
    assert_eq!(notifier.shown.lock().unwrap().len(), 1);
}

#[test]
fn delivery_surfaces_notifier_failure() {
    struct Denied;
    impl Notifier for Denied {
        fn show(&self, _payload: &ReminderPayload) -> Result<(), HostError> {
            Err(HostError::PermissionDenied("blocked".to_string()))
        }
    }

    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));
    let created = service.submit(&form("Water", "10:00", "10:05")).unwrap();

    let err = ReminderDelivery::new(&repo, Denied)
        .handle_fired_id(created.task.id)
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Notifier(HostError::PermissionDenied(_))));
}

#[test]
fn service_rearm_reschedules_everything() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let host = InMemoryAlarmHost::new();
    let service = TaskService::new(&repo, ReminderScheduler::new(&host, FixedClock::new(at(7, 0))));
    service.submit(&form("One", "08:00", "09:00")).unwrap();
    service.submit(&form("Two", "09:00", "10:00")).unwrap();
    host.clear();

    let report = service.rearm_reminders().unwrap();

    assert_eq!(report.scheduled.len(), 2);
    assert_eq!(host.len(), 2);
}
