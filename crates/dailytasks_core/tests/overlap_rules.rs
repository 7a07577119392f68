use dailytasks_core::planner::overlap::{find_conflict, is_acceptable};
use dailytasks_core::{Task, TimeOfDay};

fn task(start: &str, end: &str) -> Task {
    Task::new(
        "block",
        TimeOfDay::parse(start).unwrap(),
        TimeOfDay::parse(end).unwrap(),
    )
    .unwrap()
}

#[test]
fn morning_block_scenario() {
    let existing = vec![task("09:00", "10:00")];

    assert!(is_acceptable(&task("10:00", "11:00"), &existing, None));
    assert!(!is_acceptable(&task("09:30", "09:45"), &existing, None));
    assert!(is_acceptable(&task("08:00", "09:00"), &existing, None));
}

#[test]
fn touching_intervals_are_accepted_both_ways() {
    let a = task("13:00", "14:00");
    let b = task("14:00", "15:30");

    assert!(is_acceptable(&a, std::slice::from_ref(&b), None));
    assert!(is_acceptable(&b, std::slice::from_ref(&a), None));
}

#[test]
fn identical_intervals_are_rejected() {
    let a = task("07:15", "08:00");
    let b = task("07:15", "08:00");

    assert!(!is_acceptable(&a, std::slice::from_ref(&b), None));
}

#[test]
fn overlap_detection_is_symmetric() {
    let pairs = [
        (("09:00", "10:00"), ("09:59", "11:00")),
        (("09:00", "12:00"), ("10:00", "11:00")),
        (("09:00", "10:00"), ("10:00", "11:00")),
        (("06:00", "07:00"), ("20:00", "21:00")),
    ];
    for ((a_start, a_end), (b_start, b_end)) in pairs {
        let a = task(a_start, a_end);
        let b = task(b_start, b_end);
        assert_eq!(
            is_acceptable(&a, std::slice::from_ref(&b), None),
            is_acceptable(&b, std::slice::from_ref(&a), None),
            "{a_start}-{a_end} vs {b_start}-{b_end}"
        );
    }
}

#[test]
fn editing_a_task_ignores_its_own_interval() {
    let stored = task("09:00", "10:00");
    let existing = vec![stored.clone(), task("11:00", "12:00")];

    assert!(is_acceptable(&stored, &existing, Some(stored.id)));

    let mut moved = stored.clone();
    moved.end = TimeOfDay::parse("11:30").unwrap();
    let conflict = find_conflict(&moved, &existing, Some(stored.id)).unwrap();
    assert_eq!(conflict.start.format_24h(), "11:00");
}
